use thiserror::Error;

/// Outcome of a failed sensor read, split by whether the caller should retry.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("transient sensor read failure: {0}")]
    Transient(String),
    #[error("sensor device failure: {0}")]
    Fatal(String),
}

impl SensorError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SensorError::Transient(_))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("GPIO error: {0}")]
    Gpio(String),
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error("Calibration error: {0}")]
    Calibration(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
