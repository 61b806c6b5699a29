use feedback_core::FeedbackStatus;
use feedback_port::{Envelope, LocalPort, PortError};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::haptics::{HapticOutput, LogHaptics};
use crate::presenter::{FaceState, Presenter};

/// The watch face: listens on its port and presents every status it
/// receives.
pub struct Face {
    port: LocalPort,
    inbound: mpsc::Receiver<Envelope>,
    presenter: Presenter,
    state: watch::Sender<FaceState>,
}

impl Face {
    pub async fn open(config: &Config) -> Result<Self, PortError> {
        let haptics: Option<Box<dyn HapticOutput>> = if config.haptics.enabled {
            Some(Box::new(LogHaptics::new(config.haptics.pattern.as_str())))
        } else {
            None
        };

        Self::with_presenter(config, Presenter::new(haptics)).await
    }

    pub async fn with_presenter(config: &Config, presenter: Presenter) -> Result<Self, PortError> {
        let (port, inbound) =
            LocalPort::open(&config.port.runtime_dir, config.port.local_address()).await?;
        let (state, _) = watch::channel(presenter.state().clone());

        Ok(Self {
            port,
            inbound,
            presenter,
            state,
        })
    }

    /// Observe the face as it changes.
    pub fn subscribe(&self) -> watch::Receiver<FaceState> {
        self.state.subscribe()
    }

    fn receive(&mut self, envelope: Envelope) {
        let decoded = FeedbackStatus::decode(&envelope.bundle);
        if !decoded.is_clean() {
            warn!(
                sender = %envelope.sender_app_id,
                fallbacks = ?decoded.fallbacks,
                "Malformed feedback fields"
            );
        }

        if self.presenter.apply(&decoded.status) {
            self.state.send_replace(self.presenter.state().clone());
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            app_id = %self.port.address().app_id,
            port = %self.port.address().port_name,
            "Watch face listening"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Watch face cancelled");
                    break;
                }
                envelope = self.inbound.recv() => {
                    let Some(envelope) = envelope else {
                        warn!("Port closed");
                        break;
                    };
                    self.receive(envelope);
                }
            }
        }

        self.port.close();
    }
}
