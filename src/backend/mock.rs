use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::config::Level;
use crate::error::AppError;
use crate::gpio::GpioBackend;

/// Operation recorded by [`MockGpioBackend`], in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioOp {
    Setup(u32, Level),
    Write(u32, Level),
    Release(u32),
}

/// In-memory backend used for tests and for running without hardware.
#[derive(Default)]
pub struct MockGpioBackend {
    lines: Mutex<FxHashMap<u32, Level>>, // claimed lines and their level
    journal: Mutex<Vec<GpioOp>>,
    fail_writes: Mutex<bool>,
}

impl MockGpioBackend {
    /// Current level of a claimed line.
    pub fn level(&self, line: u32) -> Option<Level> {
        self.lines.lock().get(&line).copied()
    }

    pub fn is_claimed(&self, line: u32) -> bool {
        self.lines.lock().contains_key(&line)
    }

    pub fn journal(&self) -> Vec<GpioOp> {
        self.journal.lock().clone()
    }

    /// Makes every subsequent write fail, to simulate a driver fault.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }
}

impl GpioBackend for MockGpioBackend {
    fn setup_output(&self, line: u32, initial: Level) -> Result<(), AppError> {
        let mut lines = self.lines.lock();
        if lines.contains_key(&line) {
            return Err(AppError::Gpio(format!("line {line} is busy")));
        }
        lines.insert(line, initial);
        self.journal.lock().push(GpioOp::Setup(line, initial));
        Ok(())
    }

    fn write_level(&self, line: u32, level: Level) -> Result<(), AppError> {
        if *self.fail_writes.lock() {
            return Err(AppError::Gpio(format!("set value on line {line}: injected fault")));
        }

        let mut lines = self.lines.lock();
        let current = lines
            .get_mut(&line)
            .ok_or_else(|| AppError::InvalidState(format!("line {line} not claimed")))?;
        *current = level;
        self.journal.lock().push(GpioOp::Write(line, level));
        Ok(())
    }

    fn release(&self, line: u32) -> Result<(), AppError> {
        self.lines
            .lock()
            .remove(&line)
            .ok_or_else(|| AppError::InvalidState(format!("line {line} not claimed")))?;
        self.journal.lock().push(GpioOp::Release(line));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_requires_claim() {
        let backend = MockGpioBackend::default();
        assert!(backend.write_level(5, Level::High).is_err());

        backend.setup_output(5, Level::Low).unwrap();
        assert!(backend.setup_output(5, Level::Low).is_err());
        backend.write_level(5, Level::High).unwrap();
        assert_eq!(backend.level(5), Some(Level::High));

        backend.release(5).unwrap();
        assert!(backend.release(5).is_err());
        assert_eq!(
            backend.journal(),
            vec![
                GpioOp::Setup(5, Level::Low),
                GpioOp::Write(5, Level::High),
                GpioOp::Release(5)
            ]
        );
    }
}
