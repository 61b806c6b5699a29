use std::path::Path;

use feedback_core::FeedbackStatus;
use feedback_port::{Delivery, Envelope, LocalPort, PortAddress, PortError, RemotePort};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

/// Sends status snapshots from the local port to the watch face.
pub struct FeedbackRelay {
    local: LocalPort,
    remote: RemotePort,
}

impl FeedbackRelay {
    /// Open the local port and resolve the watch face's port. Messages sent
    /// back to this process arrive on the returned receiver.
    pub async fn open(
        runtime_dir: impl AsRef<Path>,
        local: PortAddress,
        remote: PortAddress,
    ) -> Result<(Self, mpsc::Receiver<Envelope>), PortError> {
        let runtime_dir = runtime_dir.as_ref();
        let (local, rx) = LocalPort::open(runtime_dir, local).await?;
        let remote = RemotePort::new(runtime_dir, remote);

        Ok((Self { local, remote }, rx))
    }

    pub fn remote(&self) -> &RemotePort {
        &self.remote
    }

    #[instrument(skip(self), fields(combination = %status.combination))]
    pub async fn relay(&self, status: &FeedbackStatus) -> Result<Delivery, PortError> {
        let delivery = self.local.send(&status.encode(), &self.remote).await?;

        if delivery == Delivery::PeerUnreachable {
            debug!(
                remote_app = self.remote.app_id(),
                remote_port = self.remote.port_name(),
                "PORT_ERROR: watch face port is not running"
            );
        }
        Ok(delivery)
    }

    pub fn close(self) {
        self.local.close();
    }
}
