pub mod simulated;

use feedback_core::SensorKind;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::permission::{PermissionChecker, PermissionStatus, Privilege};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("{0} sensor is not supported on this device")]
    Unsupported(SensorKind),
    #[error("access to the {0} sensor was denied")]
    PermissionDenied(SensorKind),
    #[error("access to the {0} sensor has not been granted yet")]
    PermissionPending(SensorKind),
    #[error("{kind} sensor failed: {reason}")]
    Failed { kind: SensorKind, reason: Box<str> },
}

/// A platform capability that can be acquired once and then switched on and
/// off any number of times.
pub trait Sensor: Send + Sync {
    /// Obtain the underlying device. Called once, after the privilege check.
    fn acquire(&mut self) -> Result<(), SensorError>;

    fn start(&mut self) -> Result<(), SensorError>;

    fn stop(&mut self) -> Result<(), SensorError>;

    /// Release the underlying device. Must be safe to call more than once.
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Acquisition {
    NotAcquired,
    Acquired,
    /// Permanently unusable; every further call is a no-op.
    Unsupported,
}

/// Owns one sensor and tracks whether it is running.
pub struct SensorHandle {
    kind: SensorKind,
    sensor: Option<Box<dyn Sensor>>,
    acquisition: Acquisition,
    running: bool,
}

impl SensorHandle {
    pub fn new(kind: SensorKind, sensor: Box<dyn Sensor>) -> Self {
        Self {
            kind,
            sensor: Some(sensor),
            acquisition: Acquisition::NotAcquired,
            running: false,
        }
    }

    /// A slot with no backing sensor. Start and stop succeed without effect.
    pub fn reserved(kind: SensorKind) -> Self {
        Self {
            kind,
            sensor: None,
            acquisition: Acquisition::NotAcquired,
            running: false,
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Whether the underlying sensor is running.
    pub fn is_active(&self) -> bool {
        self.running
    }

    pub fn is_unsupported(&self) -> bool {
        self.acquisition == Acquisition::Unsupported
    }

    pub fn start(&mut self, permissions: &dyn PermissionChecker) -> Result<(), SensorError> {
        let kind = self.kind;
        let Some(sensor) = self.sensor.as_mut() else {
            debug!(%kind, "No backing sensor, nothing to start");
            return Ok(());
        };

        match self.acquisition {
            Acquisition::Unsupported => return Err(SensorError::Unsupported(kind)),
            Acquisition::Acquired => {}
            Acquisition::NotAcquired => {
                if let Some(privilege) = Privilege::for_kind(kind) {
                    match permissions.check(privilege) {
                        PermissionStatus::Allow => {}
                        PermissionStatus::Deny => return Err(SensorError::PermissionDenied(kind)),
                        PermissionStatus::Ask => return Err(SensorError::PermissionPending(kind)),
                    }
                }

                match sensor.acquire() {
                    Ok(()) => {
                        info!(%kind, "Sensor acquired");
                        self.acquisition = Acquisition::Acquired;
                    }
                    Err(SensorError::Unsupported(kind)) => {
                        warn!(%kind, "Sensor unsupported, disabling handle");
                        self.acquisition = Acquisition::Unsupported;
                        return Err(SensorError::Unsupported(kind));
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if self.running {
            return Ok(());
        }
        sensor.start()?;
        self.running = true;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), SensorError> {
        let Some(sensor) = self.sensor.as_mut() else {
            return Ok(());
        };
        if !self.running {
            return Ok(());
        }

        // Considered stopped even if the device reports an error.
        self.running = false;
        sensor.stop()
    }
}

impl Drop for SensorHandle {
    fn drop(&mut self) {
        if let Some(sensor) = self.sensor.as_mut() {
            if self.running {
                if let Err(e) = sensor.stop() {
                    debug!(kind = %self.kind, error = %e, "Sensor did not stop on drop");
                }
            }
            if self.acquisition == Acquisition::Acquired {
                sensor.release();
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records every call it receives.
    #[derive(Clone, Default)]
    pub struct FakeSensor {
        pub calls: Arc<Mutex<Vec<&'static str>>>,
        pub unsupported: bool,
        pub fail_start: bool,
        pub fail_stop: bool,
    }

    impl FakeSensor {
        pub fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Sensor for FakeSensor {
        fn acquire(&mut self) -> Result<(), SensorError> {
            self.record("acquire");
            if self.unsupported {
                return Err(SensorError::Unsupported(SensorKind::Health));
            }
            Ok(())
        }

        fn start(&mut self) -> Result<(), SensorError> {
            self.record("start");
            if self.fail_start {
                return Err(SensorError::Failed {
                    kind: SensorKind::Health,
                    reason: "busy".into(),
                });
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<(), SensorError> {
            self.record("stop");
            if self.fail_stop {
                return Err(SensorError::Failed {
                    kind: SensorKind::Health,
                    reason: "stuck".into(),
                });
            }
            Ok(())
        }

        fn release(&mut self) {
            self.record("release");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeSensor;
    use super::*;
    use crate::permission::StaticPermissions;

    #[test]
    fn acquires_once_then_toggles() {
        let fake = FakeSensor::default();
        let mut handle = SensorHandle::new(SensorKind::Health, Box::new(fake.clone()));
        let permissions = StaticPermissions::allow_all();

        handle.start(&permissions).unwrap();
        handle.stop().unwrap();
        handle.start(&permissions).unwrap();
        assert!(handle.is_active());
        drop(handle);

        assert_eq!(
            fake.calls(),
            vec!["acquire", "start", "stop", "start", "stop", "release"]
        );
    }

    #[test]
    fn unsupported_sensor_is_never_retried() {
        let fake = FakeSensor {
            unsupported: true,
            ..Default::default()
        };
        let mut handle = SensorHandle::new(SensorKind::Health, Box::new(fake.clone()));
        let permissions = StaticPermissions::allow_all();

        assert!(matches!(
            handle.start(&permissions),
            Err(SensorError::Unsupported(_))
        ));
        assert!(matches!(
            handle.start(&permissions),
            Err(SensorError::Unsupported(_))
        ));
        assert!(handle.is_unsupported());
        assert!(!handle.is_active());
        assert_eq!(fake.calls(), vec!["acquire"]);
    }

    #[test]
    fn denied_permission_blocks_acquisition() {
        let fake = FakeSensor::default();
        let mut handle = SensorHandle::new(SensorKind::Location, Box::new(fake.clone()));
        let permissions = StaticPermissions {
            health: PermissionStatus::Allow,
            location: PermissionStatus::Deny,
        };

        assert_eq!(
            handle.start(&permissions),
            Err(SensorError::PermissionDenied(SensorKind::Location))
        );
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn pending_permission_is_checked_again_on_next_start() {
        let fake = FakeSensor::default();
        let mut handle = SensorHandle::new(SensorKind::Location, Box::new(fake.clone()));

        let asking = StaticPermissions {
            health: PermissionStatus::Allow,
            location: PermissionStatus::Ask,
        };
        assert_eq!(
            handle.start(&asking),
            Err(SensorError::PermissionPending(SensorKind::Location))
        );

        handle.start(&StaticPermissions::allow_all()).unwrap();
        assert_eq!(fake.calls(), vec!["acquire", "start"]);
    }

    #[test]
    fn drop_releases_even_if_stop_fails() {
        let fake = FakeSensor {
            fail_stop: true,
            ..Default::default()
        };
        let mut handle = SensorHandle::new(SensorKind::Health, Box::new(fake.clone()));

        handle.start(&StaticPermissions::allow_all()).unwrap();
        drop(handle);

        assert_eq!(fake.calls(), vec!["acquire", "start", "stop", "release"]);
    }

    #[test]
    fn reserved_slot_has_no_effect() {
        let mut handle = SensorHandle::reserved(SensorKind::Activity);

        handle.start(&StaticPermissions::allow_all()).unwrap();
        handle.stop().unwrap();
        assert!(!handle.is_active());
    }
}
