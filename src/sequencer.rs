use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::config::SequenceConfig;
use crate::error::AppError;
use crate::gpio::{GpioBackend, Relay};
use crate::signal::StopSignal;

/// Energizes a bank of relays one at a time, for wiring checks.
pub struct RelaySequencer<B: GpioBackend> {
    relays: Vec<Relay<B>>,
    delay: Duration,
    once: bool,
}

impl<B: GpioBackend> RelaySequencer<B> {
    /// Validates the pin list and claims every line at its inactive level.
    /// Lines claimed before a failure are released again when the partial
    /// bank is dropped.
    pub fn new(backend: Arc<B>, config: &SequenceConfig) -> Result<Self, AppError> {
        config.validate()?;
        let relays = config
            .lines
            .iter()
            .map(|&line| Relay::new(Arc::clone(&backend), line, config.polarity))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            relays,
            delay: config.delay,
            once: config.once,
        })
    }

    pub fn run(mut self, stop: &StopSignal) -> Result<(), AppError> {
        let lines: Vec<u32> = self.relays.iter().map(Relay::line).collect();
        info!(
            "sequence started on pins {lines:?} with delay={:?}",
            self.delay
        );

        let result = self.cycle(stop);
        let shutdown = self.shutdown();
        info!("GPIO released");

        result.and(shutdown)
    }

    fn cycle(&mut self, stop: &StopSignal) -> Result<(), AppError> {
        loop {
            for relay in self.relays.iter_mut() {
                if stop.is_stopped() {
                    return Ok(());
                }
                info!("activating pin {}", relay.line());
                relay.on()?;
                let stopped = stop.wait(self.delay);
                relay.off()?;
                info!("de-activated pin {}", relay.line());
                if stopped {
                    return Ok(());
                }
            }
            if self.once {
                info!("single pass complete");
                return Ok(());
            }
        }
    }

    fn shutdown(&mut self) -> Result<(), AppError> {
        let mut result = Ok(());
        for relay in self.relays.iter_mut() {
            if relay.is_active()
                && let Err(e) = relay.off()
            {
                warn!("failed to de-activate pin {}: {e}", relay.line());
                result = result.and(Err(e));
            }
            if let Err(e) = relay.cleanup() {
                warn!("failed to release pin {}: {e}", relay.line());
                result = result.and(Err(e));
            }
        }
        result
    }
}
