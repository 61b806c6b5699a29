use std::time::Duration;

use feedback_core::{MAX_ACTIVE, SensorKind, ServiceState};
use tracing::{debug, warn};

use crate::permission::{PermissionChecker, Privilege};
use crate::sensor::SensorHandle;
use crate::sensor::simulated::SimulatedSensor;

/// Owns every sensor handle and the active/inactive bookkeeping.
///
/// Bookkeeping follows the caller's intent even when the underlying sensor
/// fails: a kind marked active stays active and a failed start is logged.
pub struct ServiceRegistry {
    handles: Vec<SensorHandle>,
    state: ServiceState,
    permissions: Box<dyn PermissionChecker>,
}

impl ServiceRegistry {
    /// `handles` must hold one handle per kind.
    pub fn new(handles: Vec<SensorHandle>, permissions: Box<dyn PermissionChecker>) -> Self {
        debug_assert!(
            SensorKind::ALL
                .iter()
                .all(|kind| handles.iter().filter(|h| h.kind() == *kind).count() == 1)
        );

        Self {
            handles,
            state: ServiceState::new(),
            permissions,
        }
    }

    /// Simulated heart-rate and location sensors plus the reserved activity
    /// slot. Kinds listed in `unsupported` behave like missing hardware.
    pub fn simulated(
        sampling_interval: Duration,
        unsupported: &[SensorKind],
        permissions: Box<dyn PermissionChecker>,
    ) -> Self {
        let sensor = |kind| {
            if unsupported.contains(&kind) {
                SimulatedSensor::unsupported(kind)
            } else {
                SimulatedSensor::new(kind, sampling_interval)
            }
        };

        let handles = vec![
            SensorHandle::new(SensorKind::Health, Box::new(sensor(SensorKind::Health))),
            SensorHandle::new(SensorKind::Location, Box::new(sensor(SensorKind::Location))),
            SensorHandle::reserved(SensorKind::Activity),
        ];

        Self::new(handles, permissions)
    }

    fn handle_mut(&mut self, kind: SensorKind) -> Option<&mut SensorHandle> {
        self.handles.iter_mut().find(|h| h.kind() == kind)
    }

    /// Activate `kind`. Returns false if it was already active or if the
    /// active cap is reached.
    pub fn start(&mut self, kind: SensorKind) -> bool {
        if self.state.is_active(kind) {
            return false;
        }
        if self.state.active_count() >= MAX_ACTIVE {
            debug!(%kind, active = self.state.active_count(), "Active cap reached, not starting");
            return false;
        }

        self.state.set(kind, true);

        let permissions = &*self.permissions;
        if let Some(handle) = self.handles.iter_mut().find(|h| h.kind() == kind) {
            if let Err(e) = handle.start(permissions) {
                warn!(%kind, error = %e, "Sensor did not start");
            }
        }
        true
    }

    /// Deactivate `kind`. Returns false if it was not active.
    pub fn stop(&mut self, kind: SensorKind) -> bool {
        if !self.state.is_active(kind) {
            return false;
        }

        self.state.set(kind, false);

        if let Some(handle) = self.handle_mut(kind) {
            if let Err(e) = handle.stop() {
                warn!(%kind, error = %e, "Sensor did not stop cleanly");
            }
        }
        true
    }

    /// Flip `kind`. Returns whether anything changed.
    pub fn toggle(&mut self, kind: SensorKind) -> bool {
        if self.is_active(kind) {
            self.stop(kind)
        } else {
            self.start(kind)
        }
    }

    /// Answer a pending permission request for the privilege guarding
    /// `kind`. The next start of `kind` sees the answer.
    pub fn answer_permission(&mut self, kind: SensorKind, allowed: bool) -> bool {
        Privilege::for_kind(kind)
            .is_some_and(|privilege| self.permissions.answer(privilege, allowed))
    }

    pub fn is_active(&self, kind: SensorKind) -> bool {
        self.state.is_active(kind)
    }

    pub fn active_count(&self) -> usize {
        self.state.active_count()
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Start kinds in order until every kind runs or the cap is reached.
    /// Returns the number of kinds started.
    pub fn start_all(&mut self) -> usize {
        SensorKind::ALL
            .into_iter()
            .filter(|kind| self.start(*kind))
            .count()
    }

    /// Returns the number of kinds stopped.
    pub fn stop_all(&mut self) -> usize {
        SensorKind::ALL
            .into_iter()
            .filter(|kind| self.stop(*kind))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::permission::{PermissionStatus, StaticPermissions};
    use crate::sensor::testing::FakeSensor;

    fn fake_registry() -> (ServiceRegistry, FakeSensor, FakeSensor) {
        let health = FakeSensor::default();
        let location = FakeSensor::default();
        let registry = ServiceRegistry::new(
            vec![
                SensorHandle::new(SensorKind::Health, Box::new(health.clone())),
                SensorHandle::new(SensorKind::Location, Box::new(location.clone())),
                SensorHandle::reserved(SensorKind::Activity),
            ],
            Box::new(StaticPermissions::allow_all()),
        );
        (registry, health, location)
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (mut registry, health, _) = fake_registry();

        assert!(registry.start(SensorKind::Health));
        assert!(!registry.start(SensorKind::Health));
        assert!(registry.is_active(SensorKind::Health));

        assert!(registry.stop(SensorKind::Health));
        assert!(!registry.stop(SensorKind::Health));
        assert!(!registry.is_active(SensorKind::Health));

        assert_eq!(health.calls(), vec!["acquire", "start", "stop"]);
    }

    #[test]
    fn cap_limits_active_kinds() {
        let (mut registry, _, _) = fake_registry();

        assert!(registry.start(SensorKind::Activity));
        assert!(registry.start(SensorKind::Location));
        assert!(!registry.start(SensorKind::Health));
        assert_eq!(registry.active_count(), MAX_ACTIVE);
    }

    #[test]
    fn start_all_fills_up_to_the_cap_in_order() {
        let (mut registry, _, _) = fake_registry();

        assert_eq!(registry.start_all(), 2);
        assert!(registry.is_active(SensorKind::Health));
        assert!(registry.is_active(SensorKind::Location));
        assert!(!registry.is_active(SensorKind::Activity));

        assert_eq!(registry.start_all(), 0);
        assert_eq!(registry.stop_all(), 2);
        assert_eq!(registry.stop_all(), 0);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn bookkeeping_survives_sensor_failure() {
        let broken = FakeSensor {
            fail_start: true,
            ..Default::default()
        };
        let mut registry = ServiceRegistry::new(
            vec![
                SensorHandle::new(SensorKind::Health, Box::new(broken)),
                SensorHandle::reserved(SensorKind::Location),
                SensorHandle::reserved(SensorKind::Activity),
            ],
            Box::new(StaticPermissions::allow_all()),
        );

        assert!(registry.start(SensorKind::Health));
        assert!(registry.is_active(SensorKind::Health));
    }

    #[test]
    fn denied_permission_still_marks_active() {
        let location = FakeSensor::default();
        let mut registry = ServiceRegistry::new(
            vec![
                SensorHandle::reserved(SensorKind::Health),
                SensorHandle::new(SensorKind::Location, Box::new(location.clone())),
                SensorHandle::reserved(SensorKind::Activity),
            ],
            Box::new(StaticPermissions {
                health: PermissionStatus::Allow,
                location: PermissionStatus::Deny,
            }),
        );

        assert!(registry.start(SensorKind::Location));
        assert!(location.calls().is_empty());
    }

    #[test]
    fn answered_permission_applies_on_next_start() {
        let location = FakeSensor::default();
        let mut registry = ServiceRegistry::new(
            vec![
                SensorHandle::reserved(SensorKind::Health),
                SensorHandle::new(SensorKind::Location, Box::new(location.clone())),
                SensorHandle::reserved(SensorKind::Activity),
            ],
            Box::new(StaticPermissions {
                health: PermissionStatus::Allow,
                location: PermissionStatus::Ask,
            }),
        );

        registry.start(SensorKind::Location);
        registry.stop(SensorKind::Location);
        assert!(location.calls().is_empty());

        assert!(registry.answer_permission(SensorKind::Location, true));
        assert!(!registry.answer_permission(SensorKind::Location, false));

        registry.start(SensorKind::Location);
        assert_eq!(location.calls(), vec!["acquire", "start"]);
    }

    #[test]
    fn active_count_matches_state_under_random_operations() {
        let (mut registry, _, _) = fake_registry();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..2_000 {
            let kind = SensorKind::ALL[rng.random_range(0..SensorKind::ALL.len())];
            match rng.random_range(0..5) {
                0 => {
                    registry.start(kind);
                }
                1 => {
                    registry.stop(kind);
                }
                2 => {
                    registry.toggle(kind);
                }
                3 => {
                    registry.start_all();
                }
                _ => {
                    registry.stop_all();
                }
            }

            let counted = SensorKind::ALL
                .iter()
                .filter(|kind| registry.is_active(**kind))
                .count();
            assert_eq!(registry.active_count(), counted);
            assert!(registry.active_count() <= MAX_ACTIVE);
        }
    }
}
