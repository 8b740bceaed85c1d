use std::path::Path;

use log::{debug, warn};

use crate::config::{BoardPin, DhtModel};
use crate::error::{AppError, SensorError};
use crate::iio::{self, Attribute, IioDevice};

const DHT_DRIVER_NAME: &str = "dht11";
const TEMPERATURE_ATTR: &str = "in_temp_input";
const HUMIDITY_ATTR: &str = "in_humidityrelative_input";

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// A temperature/humidity source polled by the monitor loops.
///
/// `read` never retries. A `SensorError::Fatal` means the device handle has
/// already been released by the time the caller sees the error.
pub trait Sensor {
    fn read(&mut self) -> Result<SensorReading, SensorError>;
    fn release(&mut self);
}

struct DhtChannels {
    temperature: Attribute,
    humidity: Option<Attribute>,
}

/// DHT11/DHT22 read through the kernel `dht11` IIO driver.
///
/// The driver reports milli-degrees Celsius and milli-percent relative humidity.
pub struct DhtSensor {
    model: DhtModel,
    pin: BoardPin,
    channels: Option<DhtChannels>,
}

impl DhtSensor {
    /// Opens the sensor wired to `pin`, looking for an IIO device named
    /// `dht11@<pin>` and falling back to the only `dht11` device present.
    pub fn open(root: &Path, pin: BoardPin, model: DhtModel) -> Result<Self, AppError> {
        let device = Self::locate(root, pin)?;
        debug!("using {} at {}", device.name(), device.path().display());

        let temperature = device
            .open_attribute(TEMPERATURE_ATTR)
            .map_err(|e| AppError::Config(format!("open {TEMPERATURE_ATTR}: {e}")))?;
        let humidity = if device.has_attribute(HUMIDITY_ATTR) {
            Some(
                device
                    .open_attribute(HUMIDITY_ATTR)
                    .map_err(|e| AppError::Config(format!("open {HUMIDITY_ATTR}: {e}")))?,
            )
        } else {
            None
        };

        Ok(Self {
            model,
            pin,
            channels: Some(DhtChannels {
                temperature,
                humidity,
            }),
        })
    }

    fn locate(root: &Path, pin: BoardPin) -> Result<IioDevice, AppError> {
        let wanted = format!("{DHT_DRIVER_NAME}@{:x}", pin.bcm());
        let mut devices = IioDevice::scan(root, |n| n.starts_with(DHT_DRIVER_NAME))?;

        if let Some(i) = devices.iter().position(|d| d.name() == wanted) {
            return Ok(devices.swap_remove(i));
        }
        match devices.len() {
            1 => Ok(devices.remove(0)),
            0 => Err(AppError::Config(format!(
                "no {DHT_DRIVER_NAME} IIO device found for pin {pin}, is the dht11 overlay loaded?"
            ))),
            n => Err(AppError::Config(format!(
                "{n} {DHT_DRIVER_NAME} devices found and none is bound to pin {pin}"
            ))),
        }
    }

    fn read_channels(channels: &mut DhtChannels) -> Result<SensorReading, std::io::Error> {
        let temperature = channels.temperature.read_f64()?.map(|m| m / 1000.0);
        let humidity = match channels.humidity.as_mut() {
            Some(attr) => attr.read_f64()?.map(|m| m / 1000.0),
            None => None,
        };
        Ok(SensorReading {
            temperature,
            humidity,
        })
    }
}

impl Sensor for DhtSensor {
    fn read(&mut self) -> Result<SensorReading, SensorError> {
        let channels = self
            .channels
            .as_mut()
            .ok_or_else(|| SensorError::Fatal(format!("{} on {} released", self.model, self.pin)))?;

        match Self::read_channels(channels) {
            Ok(reading) => Ok(reading),
            Err(e) if iio::is_transient(&e) => {
                Err(SensorError::Transient(format!("{} read failed: {e}", self.model)))
            }
            Err(e) => {
                warn!("{} on {} failed, closing device", self.model, self.pin);
                self.release();
                Err(SensorError::Fatal(format!("{} read failed: {e}", self.model)))
            }
        }
    }

    fn release(&mut self) {
        if self.channels.take().is_some() {
            debug!("{} on {} released", self.model, self.pin);
        }
    }
}
