use log::debug;
use std::path::PathBuf;

use libgpiod::{chip::Chip, line, request};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::config::Level;
use crate::error::AppError;
use crate::gpio::GpioBackend;

/// Output lines on one GPIO character device, requested through libgpiod.
pub struct LibgpiodBackend {
    chip: String,
    requests: Mutex<FxHashMap<u32, request::Request>>, // keyed by line offset
}

impl LibgpiodBackend {
    pub fn new(chip: impl Into<String>) -> Result<Self, AppError> {
        let chip = chip.into();
        // fail early on a missing or inaccessible chip
        Self::open_chip(&chip)?;

        Ok(Self {
            chip,
            requests: Mutex::new(FxHashMap::default()),
        })
    }

    fn open_chip(path: &str) -> Result<Chip, AppError> {
        let p = PathBuf::from(path);
        Chip::open(&p).map_err(|e| AppError::Gpio(format!("open chip {path}: {e}")))
    }

    fn to_value(level: Level) -> line::Value {
        match level {
            Level::Low => line::Value::InActive,
            Level::High => line::Value::Active,
        }
    }

    fn make_line_config(offset: u32, initial: Level) -> Result<line::Config, AppError> {
        let mut ls =
            line::Settings::new().map_err(|e| AppError::Gpio(format!("libgpiod settings: {e}")))?;
        ls.set_direction(line::Direction::Output)
            .map_err(|e| AppError::Gpio(format!("set direction: {e}")))?;
        ls.set_drive(line::Drive::PushPull)
            .map_err(|e| AppError::Gpio(format!("set drive: {e}")))?;
        ls.set_output_value(Self::to_value(initial))
            .map_err(|e| AppError::Gpio(format!("set output value: {e}")))?;

        let mut cfg =
            line::Config::new().map_err(|e| AppError::Gpio(format!("line config: {e}")))?;
        cfg.add_line_settings(&[offset], ls)
            .map_err(|e| AppError::Gpio(format!("line config add settings: {e}")))?;
        Ok(cfg)
    }

    fn request_lines(chip: &Chip, line_cfg: &line::Config) -> Result<request::Request, AppError> {
        let mut req_cfg =
            request::Config::new().map_err(|e| AppError::Gpio(format!("request config: {e}")))?;
        req_cfg
            .set_consumer(env!("CARGO_PKG_NAME"))
            .map_err(|e| AppError::Gpio(format!("request consumer: {e}")))?;
        chip.request_lines(Some(&req_cfg), line_cfg)
            .map_err(|e| AppError::Gpio(format!("request lines: {e}")))
    }
}

impl GpioBackend for LibgpiodBackend {
    fn setup_output(&self, line: u32, initial: Level) -> Result<(), AppError> {
        let mut requests = self.requests.lock();
        if requests.contains_key(&line) {
            return Err(AppError::Gpio(format!("line {line} is busy")));
        }

        let chip = Self::open_chip(&self.chip)?;
        let line_cfg = Self::make_line_config(line, initial)?;
        let request = Self::request_lines(&chip, &line_cfg)?;
        debug!("requested {} line {line} as output ({initial:?})", self.chip);

        requests.insert(line, request);
        Ok(())
    }

    fn write_level(&self, line: u32, level: Level) -> Result<(), AppError> {
        let mut requests = self.requests.lock();
        let request = requests
            .get_mut(&line)
            .ok_or_else(|| AppError::InvalidState(format!("line {line} not claimed")))?;

        request
            .set_value(line, Self::to_value(level))
            .map_err(|e| AppError::Gpio(format!("set value: {e}")))?;
        Ok(())
    }

    fn release(&self, line: u32) -> Result<(), AppError> {
        // dropping the request hands the line back to the kernel
        let request = self
            .requests
            .lock()
            .remove(&line)
            .ok_or_else(|| AppError::InvalidState(format!("line {line} not claimed")))?;
        drop(request);
        debug!("released {} line {line}", self.chip);
        Ok(())
    }
}
