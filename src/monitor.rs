use std::time::Duration;

use log::{error, info, warn};

use crate::error::{AppError, SensorError};
use crate::gpio::{GpioBackend, Relay, RelayState};
use crate::sensor::Sensor;
use crate::signal::StopSignal;

/// Result of a single poll of the threshold monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The relay changed state.
    Switched(RelayState),
    /// The reading did not cross the threshold.
    Unchanged(RelayState),
    /// The sensor answered without a temperature.
    Skipped,
    /// The read failed transiently.
    Retry,
}

/// Switches a relay on while the temperature is above a threshold.
///
/// `temperature > threshold` activates, `temperature <= threshold`
/// de-activates. There is no hysteresis band.
pub struct ThresholdMonitor<S: Sensor, B: GpioBackend> {
    sensor: S,
    relay: Relay<B>,
    threshold: f64,
    interval: Duration,
}

impl<S: Sensor, B: GpioBackend> ThresholdMonitor<S, B> {
    pub fn new(sensor: S, relay: Relay<B>, threshold: f64, interval: Duration) -> Self {
        Self {
            sensor,
            relay,
            threshold,
            interval,
        }
    }

    pub fn relay_state(&self) -> RelayState {
        self.relay.state()
    }

    /// Polls the sensor once and applies the threshold rule.
    pub fn step(&mut self) -> Result<CycleOutcome, AppError> {
        let reading = match self.sensor.read() {
            Ok(reading) => reading,
            Err(SensorError::Transient(msg)) => {
                warn!("sensor read failed: {msg}");
                return Ok(CycleOutcome::Retry);
            }
            Err(e) => return Err(e.into()),
        };

        let Some(temperature) = reading.temperature.filter(|t| t.is_finite()) else {
            warn!("reading without temperature, skipping cycle");
            return Ok(CycleOutcome::Skipped);
        };

        match reading.humidity {
            Some(h) => info!("temperature: {temperature:.1}°C humidity: {h:.1}%"),
            None => info!("temperature: {temperature:.1}°C humidity: ?%"),
        }

        let state = self.relay.state();
        if temperature > self.threshold && state == RelayState::Inactive {
            info!("temperature > {:.1}°C, activating relay", self.threshold);
            self.relay.on()?;
            Ok(CycleOutcome::Switched(RelayState::Active))
        } else if temperature <= self.threshold && state == RelayState::Active {
            info!("temperature <= {:.1}°C, de-activating relay", self.threshold);
            self.relay.off()?;
            Ok(CycleOutcome::Switched(RelayState::Inactive))
        } else {
            Ok(CycleOutcome::Unchanged(state))
        }
    }

    /// Polls until `stop` is raised or a cycle fails, then turns the relay
    /// off, releases it, and releases the sensor, in that order.
    pub fn run(mut self, stop: &StopSignal) -> Result<(), AppError> {
        info!(
            "monitor started: threshold={:.1}°C, relay line={}",
            self.threshold,
            self.relay.line()
        );

        let result = self.poll(stop);
        if let Err(e) = &result {
            error!("monitor failed: {e}");
        }
        let shutdown = self.shutdown();
        info!("monitor stopped and resources released");

        result.and(shutdown)
    }

    fn poll(&mut self, stop: &StopSignal) -> Result<(), AppError> {
        while !stop.is_stopped() {
            self.step()?;
            if stop.wait(self.interval) {
                break;
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), AppError> {
        let mut result = Ok(());
        if self.relay.is_active()
            && let Err(e) = self.relay.off()
        {
            warn!("failed to de-activate relay: {e}");
            result = Err(e);
        }
        if let Err(e) = self.relay.cleanup() {
            warn!("failed to release relay: {e}");
            result = result.and(Err(e));
        }
        self.sensor.release();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockGpioBackend;
    use crate::config::Polarity;
    use crate::sensor::SensorReading;
    use std::collections::VecDeque;
    use std::sync::Arc;

    struct Scripted(VecDeque<Result<SensorReading, SensorError>>);

    impl Sensor for Scripted {
        fn read(&mut self) -> Result<SensorReading, SensorError> {
            self.0.pop_front().unwrap_or(Ok(SensorReading::default()))
        }

        fn release(&mut self) {}
    }

    fn temp(t: f64) -> Result<SensorReading, SensorError> {
        Ok(SensorReading {
            temperature: Some(t),
            humidity: None,
        })
    }

    #[test]
    fn boundary_counts_as_inactive() {
        let backend = Arc::new(MockGpioBackend::default());
        let relay = Relay::new(backend, 17, Polarity::ActiveHigh).unwrap();
        let sensor = Scripted([temp(30.0), temp(30.01)].into());
        let mut monitor = ThresholdMonitor::new(sensor, relay, 30.0, Duration::ZERO);

        assert_eq!(
            monitor.step().unwrap(),
            CycleOutcome::Unchanged(RelayState::Inactive)
        );
        assert_eq!(
            monitor.step().unwrap(),
            CycleOutcome::Switched(RelayState::Active)
        );
    }

    #[test]
    fn missing_temperature_is_skipped() {
        let backend = Arc::new(MockGpioBackend::default());
        let relay = Relay::new(backend, 17, Polarity::ActiveHigh).unwrap();
        let sensor = Scripted(
            [
                Ok(SensorReading {
                    temperature: None,
                    humidity: Some(40.0),
                }),
                temp(f64::NAN),
            ]
            .into(),
        );
        let mut monitor = ThresholdMonitor::new(sensor, relay, 30.0, Duration::ZERO);

        assert_eq!(monitor.step().unwrap(), CycleOutcome::Skipped);
        assert_eq!(monitor.step().unwrap(), CycleOutcome::Skipped);
        assert_eq!(monitor.relay_state(), RelayState::Inactive);
    }

    #[test]
    fn fatal_read_propagates_from_step() {
        let backend = Arc::new(MockGpioBackend::default());
        let relay = Relay::new(backend, 17, Polarity::ActiveHigh).unwrap();
        let sensor = Scripted([Err(SensorError::Fatal("gone".into()))].into());
        let mut monitor = ThresholdMonitor::new(sensor, relay, 30.0, Duration::ZERO);

        assert!(matches!(
            monitor.step(),
            Err(AppError::Sensor(SensorError::Fatal(_)))
        ));
    }
}
