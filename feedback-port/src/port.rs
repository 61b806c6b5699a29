use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use feedback_core::Bundle;
use thiserror::Error;
use tokio::{
    io::BufReader,
    net::{UnixListener, UnixStream},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{Envelope, FrameError, PortAddress, RemotePort, read_frame, write_frame};

const DEFAULT_BUFFER: usize = 16;
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port {0} is already open")]
    AlreadyOpen(PathBuf),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Outcome of a send. Neither variant is an error: an unreachable peer is an
/// expected condition and the next status change will simply try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    PeerUnreachable,
}

/// A port this process listens on.
///
/// Opening binds the socket and spawns an accept loop; received envelopes
/// are forwarded over the returned channel so the owner can consume them
/// from its own task. Dropping the port stops the loop and removes the
/// socket file.
pub struct LocalPort {
    address: PortAddress,
    path: PathBuf,
    cancel: CancellationToken,
}

impl LocalPort {
    pub async fn open(
        runtime_dir: impl AsRef<Path>,
        address: PortAddress,
    ) -> Result<(Self, mpsc::Receiver<Envelope>), PortError> {
        Self::open_with_buffer(runtime_dir, address, DEFAULT_BUFFER).await
    }

    pub async fn open_with_buffer(
        runtime_dir: impl AsRef<Path>,
        address: PortAddress,
        buffer: usize,
    ) -> Result<(Self, mpsc::Receiver<Envelope>), PortError> {
        let path = address.socket_path(runtime_dir.as_ref());
        let io_err = |source| PortError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        if path.exists() {
            if UnixStream::connect(&path).await.is_ok() {
                return Err(PortError::AlreadyOpen(path));
            }
            debug!(path = %path.display(), "Removing stale socket");
            std::fs::remove_file(&path).map_err(io_err)?;
        }

        let listener = UnixListener::bind(&path).map_err(io_err)?;
        if address.trusted {
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }

        let (tx, rx) = mpsc::channel(buffer);
        let cancel = CancellationToken::new();

        let span = info_span!("port", app_id = %address.app_id, port = %address.port_name);
        tokio::spawn(run_accept_loop(listener, tx, cancel.clone(), address.trusted).instrument(span));

        info!(
            app_id = %address.app_id,
            port = %address.port_name,
            trusted = address.trusted,
            "Local port open"
        );

        Ok((
            Self {
                address,
                path,
                cancel,
            },
            rx,
        ))
    }

    pub fn address(&self) -> &PortAddress {
        &self.address
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Send `bundle` to `remote` if it is listening.
    ///
    /// Liveness is probed by the connect itself, immediately before the
    /// write. A write that fails midway is reported as unreachable too.
    pub async fn send(&self, bundle: &Bundle, remote: &RemotePort) -> Result<Delivery, PortError> {
        let envelope = Envelope {
            sender_app_id: self.address.app_id.clone(),
            sender_port: self.address.port_name.clone(),
            trusted: self.address.trusted,
            bundle: bundle.clone(),
        };

        let mut stream = match remote.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                debug!(
                    remote_app = remote.app_id(),
                    remote_port = remote.port_name(),
                    error = %e,
                    "Remote port not running, dropping message"
                );
                return Ok(Delivery::PeerUnreachable);
            }
        };

        match write_frame(&mut stream, &envelope).await {
            Ok(()) => Ok(Delivery::Sent),
            Err(FrameError::Io(e)) => {
                warn!(
                    remote_app = remote.app_id(),
                    remote_port = remote.port_name(),
                    error = %e,
                    "Remote port went away during send"
                );
                Ok(Delivery::PeerUnreachable)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stop listening and release the socket.
    pub fn close(self) {
        // Drop does the work.
    }
}

impl Drop for LocalPort {
    fn drop(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();

        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove socket");
            }
        }
        info!(port = %self.address.port_name, "Local port closed");
    }
}

async fn run_accept_loop(
    listener: UnixListener,
    tx: mpsc::Sender<Envelope>,
    cancel: CancellationToken,
    trusted: bool,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Accept loop shutting down");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    // Connections are drained one at a time so messages are
                    // delivered in the order they were sent.
                    Ok((stream, _)) => {
                        let handled = tokio::time::timeout(
                            CONNECTION_TIMEOUT,
                            handle_connection(stream, &tx, &cancel, trusted),
                        )
                        .await;
                        match handled {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => warn!(error = %e, "Dropping connection"),
                            Err(_) => warn!("Connection idle too long, dropping"),
                        }
                    }
                    Err(e) => {
                        if !recover_from_accept_error(&e, &cancel).await {
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Log a failed accept and back off before the next one. Returns false
/// once cancelled.
async fn recover_from_accept_error(e: &std::io::Error, cancel: &CancellationToken) -> bool {
    warn!(error = %e, kind = ?e.kind(), "Failed to accept connection, retrying");
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
    }
}

async fn handle_connection(
    stream: UnixStream,
    tx: &mpsc::Sender<Envelope>,
    cancel: &CancellationToken,
    trusted: bool,
) -> Result<(), FrameError> {
    let mut reader = BufReader::new(stream);

    loop {
        let envelope = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            frame = read_frame(&mut reader) => match frame? {
                Some(envelope) => envelope,
                None => return Ok(()),
            },
        };

        if envelope.trusted != trusted {
            warn!(
                sender = %envelope.sender_app_id,
                sender_trusted = envelope.trusted,
                "Rejecting message with mismatched trust"
            );
            continue;
        }

        debug!(sender = %envelope.sender_app_id, fields = envelope.bundle.len(), "Received message");

        if tx.send(envelope).await.is_err() {
            debug!("Receiver dropped, closing connection");
            return Ok(());
        }
    }
}
