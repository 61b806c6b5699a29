use std::time::Duration;

use feedback_core::SensorKind;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Sensor, SensorError};

/// A value produced by a simulated sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    HeartRate { bpm: u16 },
    Position { latitude: f64, longitude: f64 },
}

/// Sensor that emits random readings at a fixed interval while running.
pub struct SimulatedSensor {
    kind: SensorKind,
    /// Interval between readings.
    interval: Duration,
    /// Pretend the device lacks this sensor.
    unsupported: bool,
    task: Option<(CancellationToken, JoinHandle<()>)>,
}

impl SimulatedSensor {
    pub fn new(kind: SensorKind, interval: Duration) -> Self {
        Self {
            kind,
            interval,
            unsupported: false,
            task: None,
        }
    }

    pub fn unsupported(kind: SensorKind) -> Self {
        Self {
            unsupported: true,
            ..Self::new(kind, Duration::from_secs(1))
        }
    }
}

/// Generate one reading for `kind`. There is no simulated activity source.
pub fn generate_reading(kind: SensorKind, rng: &mut impl Rng) -> Option<Reading> {
    match kind {
        SensorKind::Health => Some(Reading::HeartRate {
            bpm: rng.random_range(55..110),
        }),
        SensorKind::Location => Some(Reading::Position {
            // Around Göttingen, give or take a few hundred metres.
            latitude: 51.5413 + rng.random_range(-0.005..0.005),
            longitude: 9.9158 + rng.random_range(-0.005..0.005),
        }),
        SensorKind::Activity => None,
    }
}

impl Sensor for SimulatedSensor {
    fn acquire(&mut self) -> Result<(), SensorError> {
        if self.unsupported || self.kind == SensorKind::Activity {
            return Err(SensorError::Unsupported(self.kind));
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), SensorError> {
        if self.task.is_some() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| SensorError::Failed {
            kind: self.kind,
            reason: e.to_string().into(),
        })?;

        let cancel = CancellationToken::new();
        let kind = self.kind;
        let interval = self.interval;
        let cancel_task = cancel.clone();

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = cancel_task.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Some(reading) = generate_reading(kind, &mut rand::rng()) {
                            debug!(%kind, ?reading, "Sensor reading");
                        }
                    }
                }
            }
        });

        info!(kind = %self.kind, interval_ms = self.interval.as_millis() as u64, "Sensor started");
        self.task = Some((cancel, handle));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SensorError> {
        if let Some((cancel, _handle)) = self.task.take() {
            cancel.cancel();
            info!(kind = %self.kind, "Sensor stopped");
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Some((cancel, handle)) = self.task.take() {
            cancel.cancel();
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn readings_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            match generate_reading(SensorKind::Health, &mut rng) {
                Some(Reading::HeartRate { bpm }) => assert!((55..110).contains(&bpm)),
                other => panic!("unexpected reading {other:?}"),
            }
        }
    }

    #[test]
    fn activity_has_no_simulated_source() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(generate_reading(SensorKind::Activity, &mut rng), None);

        let mut sensor = SimulatedSensor::new(SensorKind::Activity, Duration::from_millis(10));
        assert_eq!(
            sensor.acquire(),
            Err(SensorError::Unsupported(SensorKind::Activity))
        );
    }

    #[test]
    fn unsupported_sensor_refuses_acquisition() {
        let mut sensor = SimulatedSensor::unsupported(SensorKind::Location);
        assert_eq!(
            sensor.acquire(),
            Err(SensorError::Unsupported(SensorKind::Location))
        );
    }

    #[test]
    fn start_without_runtime_fails() {
        let mut sensor = SimulatedSensor::new(SensorKind::Health, Duration::from_millis(10));
        assert!(matches!(sensor.start(), Err(SensorError::Failed { .. })));
    }

    #[tokio::test]
    async fn start_and_stop_manage_the_task() {
        let mut sensor = SimulatedSensor::new(SensorKind::Health, Duration::from_millis(5));

        sensor.start().unwrap();
        assert!(sensor.task.is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;

        sensor.stop().unwrap();
        assert!(sensor.task.is_none());
    }
}
