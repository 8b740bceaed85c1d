use std::sync::Arc;

use log::{debug, warn};

use crate::config::{Level, Polarity};
use crate::error::AppError;

/// Output-line access the relay tools need from a GPIO driver.
///
/// Implementations own the process-wide table of claimed lines: a line is
/// claimed by `setup_output` and returned by `release`.
pub trait GpioBackend: Send + Sync {
    fn setup_output(&self, line: u32, initial: Level) -> Result<(), AppError>;
    fn write_level(&self, line: u32, level: Level) -> Result<(), AppError>;
    fn release(&self, line: u32) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Inactive,
    Active,
}

/// A relay driven by one output line.
///
/// The line is claimed at its inactive level on construction and released
/// when `cleanup` is called or the relay is dropped, whichever comes first.
pub struct Relay<B: GpioBackend> {
    backend: Arc<B>,
    line: u32,
    polarity: Polarity,
    state: RelayState,
    released: bool,
}

impl<B: GpioBackend> Relay<B> {
    pub fn new(backend: Arc<B>, line: u32, polarity: Polarity) -> Result<Self, AppError> {
        backend.setup_output(line, polarity.inactive_level())?;
        debug!("relay on line {line} claimed ({polarity:?})");

        Ok(Self {
            backend,
            line,
            polarity,
            state: RelayState::Inactive,
            released: false,
        })
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == RelayState::Active
    }

    pub fn on(&mut self) -> Result<(), AppError> {
        self.drive(RelayState::Active)
    }

    pub fn off(&mut self) -> Result<(), AppError> {
        self.drive(RelayState::Inactive)
    }

    fn drive(&mut self, state: RelayState) -> Result<(), AppError> {
        if self.released {
            return Err(AppError::InvalidState(format!(
                "relay on line {} already released",
                self.line
            )));
        }

        let level = match state {
            RelayState::Active => self.polarity.active_level(),
            RelayState::Inactive => self.polarity.inactive_level(),
        };
        self.backend.write_level(self.line, level)?;
        self.state = state;
        Ok(())
    }

    /// Releases the line. Later calls are no-ops.
    pub fn cleanup(&mut self) -> Result<(), AppError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.backend.release(self.line)
    }
}

impl<B: GpioBackend> Drop for Relay<B> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if self.is_active()
            && let Err(e) = self.off()
        {
            warn!("failed to de-activate relay on line {}: {e}", self.line);
        }
        if let Err(e) = self.cleanup() {
            warn!("failed to release relay line {}: {e}", self.line);
        }
    }
}
