use std::ops::ControlFlow;

use feedback_core::{ActiveCombination, FeedbackStatus, ServiceState, UserPreferences};
use feedback_port::{Envelope, PortError};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::config::Config;
use crate::permission::StaticPermissions;
use crate::registry::ServiceRegistry;
use crate::relay::FeedbackRelay;
use crate::scheduler::{RandomActionScheduler, Tick};
use crate::settings::SettingsStore;

/// The main application: owns the sensors, the random scheduler and the
/// relay, and applies operator commands one at a time.
pub struct Monitor<S, R = StdRng> {
    registry: ServiceRegistry,
    scheduler: RandomActionScheduler<R>,
    settings: S,
    relay: FeedbackRelay,
    sensing_allowed: bool,
}

impl<S: SettingsStore> Monitor<S> {
    /// Build a monitor with simulated sensors as described by `config`.
    pub async fn from_config(
        config: &Config,
        settings: S,
    ) -> Result<(Self, mpsc::Receiver<Envelope>), PortError> {
        let registry = ServiceRegistry::simulated(
            std::time::Duration::from_millis(config.sensors.sampling_interval_ms),
            &config.sensors.unsupported,
            Box::new(StaticPermissions::from(&config.permissions)),
        );
        let scheduler =
            RandomActionScheduler::new(config.scheduler.clone(), StdRng::from_os_rng());
        let (relay, inbound) = FeedbackRelay::open(
            &config.port.runtime_dir,
            config.port.local_address(),
            config.port.remote_address(),
        )
        .await?;

        Ok((Self::new(registry, scheduler, settings, relay), inbound))
    }
}

impl<S: SettingsStore, R: Rng> Monitor<S, R> {
    pub fn new(
        registry: ServiceRegistry,
        scheduler: RandomActionScheduler<R>,
        settings: S,
        relay: FeedbackRelay,
    ) -> Self {
        Self {
            registry,
            scheduler,
            settings,
            relay,
            sensing_allowed: true,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.registry.state()
    }

    pub fn sensing_allowed(&self) -> bool {
        self.sensing_allowed
    }

    pub fn random_running(&self) -> bool {
        self.scheduler.is_running()
    }

    async fn preferences(&self) -> UserPreferences {
        match self.settings.load().await {
            Ok(preferences) => preferences,
            Err(e) => {
                warn!(error = %e, "Failed to load settings, using defaults");
                UserPreferences::default()
            }
        }
    }

    async fn send(&self, status: FeedbackStatus) {
        if status.combination == ActiveCombination::Error {
            warn!(?status, "Relaying status without a valid combination");
        }
        if let Err(e) = self.relay.relay(&status).await {
            error!(error = %e, "Failed to relay status");
        }
    }

    /// Relay `state` with the current preferences. Suppressed while sensing
    /// is disallowed.
    async fn relay_state(&self, state: ServiceState) {
        if !self.sensing_allowed {
            debug!("Sensing disallowed, not relaying");
            return;
        }
        let preferences = self.preferences().await;
        self.send(FeedbackStatus::new(&state, &preferences)).await;
    }

    async fn relay_current(&self) {
        self.relay_state(self.registry.state()).await;
    }

    /// Grant or revoke sensing. Revoking stops the random run and every
    /// sensor, relays the idle status once and suppresses relays until
    /// sensing is allowed again.
    pub async fn allow_sensing(&mut self, allowed: bool) {
        if allowed == self.sensing_allowed {
            return;
        }

        if allowed {
            self.sensing_allowed = true;
            info!("Sensing allowed");
            self.relay_current().await;
            return;
        }

        self.scheduler.stop(&mut self.registry);
        self.registry.stop_all();
        let preferences = self.preferences().await;
        self.send(FeedbackStatus::idle(&preferences)).await;
        self.sensing_allowed = false;
        info!("Sensing disallowed");
    }

    async fn update_preferences(&mut self, change: impl FnOnce(&mut UserPreferences)) {
        let mut preferences = self.preferences().await;
        change(&mut preferences);

        if let Err(e) = self.settings.update(preferences).await {
            warn!(error = %e, "Failed to store settings");
        }
        info!(
            vibration = preferences.vibration_enabled,
            sound = preferences.sound_enabled,
            style = %preferences.visual_style,
            "Preferences updated"
        );
        self.relay_current().await;
    }

    /// Apply one command. Breaks on `quit`.
    pub async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        debug!(%command, "Command received");

        match command {
            Command::Start(kind) => {
                if !self.sensing_allowed {
                    warn!(%kind, "Sensing disallowed, ignoring start");
                } else if self.registry.start(kind) {
                    self.relay_current().await;
                } else {
                    info!(%kind, active = self.registry.active_count(), "Sensor not started");
                }
            }
            Command::Stop(kind) => {
                if self.registry.stop(kind) {
                    self.relay_current().await;
                }
            }
            Command::Random(true) => {
                if !self.sensing_allowed {
                    warn!("Sensing disallowed, ignoring random run");
                } else if !self.scheduler.start() {
                    info!("Random run already in progress");
                }
            }
            Command::Random(false) => {
                if self.scheduler.stop(&mut self.registry) {
                    self.relay_current().await;
                }
            }
            Command::AllowSensing(allowed) => self.allow_sensing(allowed).await,
            Command::Permit(kind, allowed) => {
                if self.registry.answer_permission(kind, allowed) {
                    info!(%kind, allowed, "Permission answered");
                } else {
                    info!(%kind, "No pending permission request");
                }
            }
            Command::Vibration(on) => {
                self.update_preferences(|p| p.vibration_enabled = on).await;
            }
            Command::Sound(on) => {
                self.update_preferences(|p| p.sound_enabled = on).await;
            }
            Command::Style(style) => {
                self.update_preferences(|p| p.visual_style = style).await;
            }
            Command::Status => {
                let preferences = self.preferences().await;
                let status = FeedbackStatus::new(&self.registry.state(), &preferences);
                let watch_face_running = self.relay.remote().is_running().await;
                info!(
                    combination = %status.combination,
                    style = %status.visual_style,
                    vibration = status.vibration_enabled,
                    sound = status.sound_enabled,
                    sensing_allowed = self.sensing_allowed,
                    random = self.scheduler.is_running(),
                    watch_face_running,
                    "Status"
                );
            }
            Command::Quit => return ControlFlow::Break(()),
        }

        ControlFlow::Continue(())
    }

    /// Advance the random run by one tick. Returns false once the run is
    /// over.
    pub async fn on_tick(&mut self) -> bool {
        match self.scheduler.tick(&mut self.registry) {
            Tick::Idle => false,
            Tick::Waiting => true,
            Tick::Exhausted => {
                self.relay_current().await;
                false
            }
            Tick::Applied { snapshot, .. } => {
                self.relay_state(snapshot).await;
                true
            }
            Tick::Finished { snapshot, .. } => {
                self.relay_state(snapshot).await;
                self.relay_current().await;
                false
            }
        }
    }

    fn new_ticker(&self) -> Interval {
        let mut ticker = tokio::time::interval(self.scheduler.config().tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Run until `quit` or until `cancel` fires. Keeps running without
    /// commands once the command channel closes.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut inbound: mpsc::Receiver<Envelope>,
        cancel: CancellationToken,
    ) {
        info!(
            remote_app = self.relay.remote().app_id(),
            remote_port = self.relay.remote().port_name(),
            "Monitor running"
        );
        let mut ticker: Option<Interval> = None;
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Monitor cancelled");
                    break;
                }
                command = commands.recv(), if commands_open => {
                    let Some(command) = command else {
                        info!("Command input closed");
                        commands_open = false;
                        continue;
                    };
                    if self.handle_command(command).await.is_break() {
                        break;
                    }
                }
                _ = next_tick(&mut ticker) => {
                    if !self.on_tick().await {
                        ticker = None;
                    }
                }
                Some(envelope) = inbound.recv() => {
                    debug!(
                        sender = %envelope.sender_app_id,
                        fields = envelope.bundle.len(),
                        "Ignoring message from peer"
                    );
                }
            }

            match (self.scheduler.is_running(), ticker.is_some()) {
                (true, false) => ticker = Some(self.new_ticker()),
                (false, true) => ticker = None,
                _ => {}
            }
        }

        self.shutdown().await;
    }

    /// Stop everything and tell the face once if anything was running.
    async fn shutdown(mut self) {
        let aborted = self.scheduler.stop(&mut self.registry);
        let stopped = self.registry.stop_all();
        if aborted || stopped > 0 {
            self.relay_current().await;
        }
        info!(stopped, aborted, "Monitor stopped");
        self.relay.close();
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
