pub mod adc;
pub mod backend;
pub mod calibration;
pub mod config;
pub mod error;
pub mod gpio;
pub mod iio;
pub mod monitor;
pub mod readout;
pub mod sensor;
pub mod sequencer;
pub mod signal;

pub use adc::{AnalogReading, AnalogSource, Mcp3008};
pub use calibration::{Buffer, Calibration};
pub use config::{BoardPin, DhtModel, Level, Polarity, SequenceConfig, ThresholdConfig};
pub use error::{AppError, SensorError};
pub use gpio::{GpioBackend, Relay, RelayState};
pub use monitor::{CycleOutcome, ThresholdMonitor};
pub use sensor::{DhtSensor, Sensor, SensorReading};
pub use sequencer::RelaySequencer;
pub use signal::StopSignal;

#[cfg(feature = "hardware-gpio")]
pub use backend::LibgpiodBackend;
pub use backend::MockGpioBackend;
