use std::fmt;
use std::time::Duration;

use feedback_core::{SensorKind, ServiceState};
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info};

use crate::registry::ServiceRegistry;

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Polling period in milliseconds. Cancellation is observed at this
    /// granularity.
    pub tick_ms: u64,
    /// A decision is taken on the first of every `ticks_per_action` ticks.
    pub ticks_per_action: u32,
    /// Number of decisions in one run.
    pub actions_per_run: u32,
}

impl SchedulerConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 500,
            ticks_per_action: 10,
            actions_per_run: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RandomAction {
    ToggleHealth,
    ToggleLocation,
    StartAll,
    StopAll,
}

impl RandomAction {
    pub const ALL: [RandomAction; 4] = [
        RandomAction::ToggleHealth,
        RandomAction::ToggleLocation,
        RandomAction::StartAll,
        RandomAction::StopAll,
    ];

    fn apply(self, registry: &mut ServiceRegistry) {
        match self {
            RandomAction::ToggleHealth => {
                registry.toggle(SensorKind::Health);
            }
            RandomAction::ToggleLocation => {
                registry.toggle(SensorKind::Location);
            }
            RandomAction::StartAll => {
                registry.start_all();
            }
            RandomAction::StopAll => {
                registry.stop_all();
            }
        }
    }
}

impl fmt::Display for RandomAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RandomAction::ToggleHealth => "toggle-health",
            RandomAction::ToggleLocation => "toggle-location",
            RandomAction::StartAll => "start-all",
            RandomAction::StopAll => "stop-all",
        };
        f.write_str(name)
    }
}

/// State of one run. Discarded when the run ends.
#[derive(Debug, Clone)]
struct RandomRunState {
    previous_action: Option<RandomAction>,
    actions_remaining: u32,
    ticks_until_action: u32,
}

/// What a tick did. Every variant carrying a snapshot must be relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No run in progress; the caller should stop ticking.
    Idle,
    /// Between decisions.
    Waiting,
    Applied {
        action: RandomAction,
        snapshot: ServiceState,
    },
    /// The last action of the run was applied and every sensor has been
    /// stopped. Relay `snapshot`, then the now empty registry state.
    Finished {
        action: RandomAction,
        snapshot: ServiceState,
    },
    /// The run had no actions left to apply and every sensor has been
    /// stopped. Relay the registry state.
    Exhausted,
}

/// Randomly switches sensors on and off for demonstration.
///
/// Never applies the same action twice in a row. Driven by the caller
/// through [`tick`](Self::tick).
pub struct RandomActionScheduler<R> {
    config: SchedulerConfig,
    rng: R,
    run: Option<RandomRunState>,
}

impl<R: Rng> RandomActionScheduler<R> {
    pub fn new(config: SchedulerConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            run: None,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Begin a run. Returns false if one is already in progress.
    pub fn start(&mut self) -> bool {
        if self.run.is_some() {
            return false;
        }

        info!(
            actions = self.config.actions_per_run,
            tick_ms = self.config.tick_ms,
            "Random run started"
        );
        self.run = Some(RandomRunState {
            previous_action: None,
            actions_remaining: self.config.actions_per_run,
            ticks_until_action: 0,
        });
        true
    }

    /// Abort the run and stop every sensor. Returns true if a run was in
    /// progress, in which case the caller relays the shutdown state.
    pub fn stop(&mut self, registry: &mut ServiceRegistry) -> bool {
        let Some(run) = self.run.take() else {
            return false;
        };

        registry.stop_all();
        info!(
            actions_remaining = run.actions_remaining,
            "Random run stopped"
        );
        true
    }

    pub fn tick(&mut self, registry: &mut ServiceRegistry) -> Tick {
        let Some(run) = self.run.as_mut() else {
            return Tick::Idle;
        };

        if run.ticks_until_action > 0 {
            run.ticks_until_action -= 1;
            return Tick::Waiting;
        }
        run.ticks_until_action = self.config.ticks_per_action.saturating_sub(1);

        if run.actions_remaining == 0 {
            self.run = None;
            registry.stop_all();
            info!("Random run finished without actions");
            return Tick::Exhausted;
        }

        let action = draw_action(&mut self.rng, run.previous_action);
        action.apply(registry);
        run.previous_action = Some(action);
        run.actions_remaining -= 1;

        let snapshot = registry.state();
        debug!(%action, remaining = run.actions_remaining, active = snapshot.active_count(), "Random action applied");

        if run.actions_remaining == 0 {
            self.run = None;
            registry.stop_all();
            info!("Random run finished");
            return Tick::Finished { action, snapshot };
        }

        Tick::Applied { action, snapshot }
    }
}

/// Uniform draw over the four actions, redrawn while equal to `previous`.
fn draw_action(rng: &mut impl Rng, previous: Option<RandomAction>) -> RandomAction {
    loop {
        let action = RandomAction::ALL[rng.random_range(0..RandomAction::ALL.len())];
        if Some(action) != previous {
            return action;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::permission::StaticPermissions;
    use crate::sensor::SensorHandle;

    fn registry() -> ServiceRegistry {
        ServiceRegistry::new(
            SensorKind::ALL
                .into_iter()
                .map(SensorHandle::reserved)
                .collect(),
            Box::new(StaticPermissions::allow_all()),
        )
    }

    fn scheduler(seed: u64, ticks_per_action: u32, actions_per_run: u32) -> RandomActionScheduler<StdRng> {
        RandomActionScheduler::new(
            SchedulerConfig {
                tick_ms: 1,
                ticks_per_action,
                actions_per_run,
            },
            StdRng::seed_from_u64(seed),
        )
    }

    fn run_to_completion(
        scheduler: &mut RandomActionScheduler<StdRng>,
        registry: &mut ServiceRegistry,
    ) -> Vec<RandomAction> {
        let mut actions = Vec::new();
        loop {
            match scheduler.tick(registry) {
                Tick::Idle | Tick::Exhausted => break,
                Tick::Waiting => {}
                Tick::Applied { action, .. } => actions.push(action),
                Tick::Finished { action, .. } => {
                    actions.push(action);
                    break;
                }
            }
        }
        actions
    }

    #[test]
    fn never_repeats_an_action() {
        for seed in 0..20 {
            let mut registry = registry();
            let mut scheduler = scheduler(seed, 1, 500);
            assert!(scheduler.start());

            let actions = run_to_completion(&mut scheduler, &mut registry);

            assert_eq!(actions.len(), 500);
            assert!(
                actions.windows(2).all(|w| w[0] != w[1]),
                "seed {seed} repeated an action"
            );
        }
    }

    #[test]
    fn draw_covers_every_other_action() {
        let mut rng = StdRng::seed_from_u64(1);
        for previous in RandomAction::ALL {
            let mut seen = std::collections::HashSet::new();
            for _ in 0..200 {
                seen.insert(draw_action(&mut rng, Some(previous)));
            }
            assert_eq!(seen.len(), 3);
            assert!(!seen.contains(&previous));
        }
    }

    #[test]
    fn decision_on_first_of_every_n_ticks() {
        let mut registry = registry();
        let mut scheduler = scheduler(3, 10, 3);
        scheduler.start();

        let mut pattern = Vec::new();
        for _ in 0..21 {
            pattern.push(!matches!(scheduler.tick(&mut registry), Tick::Waiting));
        }

        let decisions: Vec<usize> = pattern
            .iter()
            .enumerate()
            .filter(|(_, decided)| **decided)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(decisions, vec![0, 10, 20]);
    }

    #[test]
    fn finishing_stops_everything_and_goes_idle() {
        let mut registry = registry();
        let mut scheduler = scheduler(9, 1, 7);
        scheduler.start();

        let actions = run_to_completion(&mut scheduler, &mut registry);

        assert_eq!(actions.len(), 7);
        assert!(!scheduler.is_running());
        assert_eq!(registry.active_count(), 0);
        assert_eq!(scheduler.tick(&mut registry), Tick::Idle);
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let mut scheduler = scheduler(0, 1, 10);

        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert!(scheduler.is_running());
    }

    #[test]
    fn stop_halts_the_run_exactly_once() {
        let mut registry = registry();
        let mut scheduler = scheduler(5, 1, 100);
        scheduler.start();

        for _ in 0..10 {
            scheduler.tick(&mut registry);
        }
        registry.start_all();

        assert!(scheduler.stop(&mut registry));
        assert_eq!(registry.active_count(), 0);
        assert!(!scheduler.stop(&mut registry));

        for _ in 0..10 {
            assert_eq!(scheduler.tick(&mut registry), Tick::Idle);
        }
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn empty_budget_stops_everything_once() {
        let mut registry = registry();
        let mut scheduler = scheduler(2, 10, 0);
        registry.start(SensorKind::Health);
        scheduler.start();

        assert_eq!(scheduler.tick(&mut registry), Tick::Exhausted);
        assert_eq!(registry.active_count(), 0);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.tick(&mut registry), Tick::Idle);
    }

    #[test]
    fn run_can_be_restarted_after_stop() {
        let mut registry = registry();
        let mut scheduler = scheduler(11, 1, 4);

        scheduler.start();
        scheduler.tick(&mut registry);
        scheduler.stop(&mut registry);

        assert!(scheduler.start());
        let actions = run_to_completion(&mut scheduler, &mut registry);
        assert_eq!(actions.len(), 4);
    }

    #[test]
    fn snapshots_respect_the_cap() {
        let mut registry = registry();
        let mut scheduler = scheduler(21, 1, 300);
        scheduler.start();

        loop {
            match scheduler.tick(&mut registry) {
                Tick::Applied { snapshot, .. } | Tick::Finished { snapshot, .. } => {
                    assert!(snapshot.active_count() <= feedback_core::MAX_ACTIVE);
                    assert!(!snapshot.is_active(SensorKind::Activity));
                }
                Tick::Waiting => {}
                Tick::Idle | Tick::Exhausted => break,
            }
        }
    }
}
