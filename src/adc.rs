use std::path::Path;

use log::debug;

use crate::error::{AppError, SensorError};
use crate::iio::{self, IioDevice};

pub const MCP3008_DRIVER_NAME: &str = "mcp3008";
pub const MCP3008_CHANNELS: u8 = 8;
const MCP3008_MAX_RAW: u16 = 1023;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogReading {
    /// Native 10-bit conversion result.
    pub raw: u16,
    pub voltage: f64,
}

impl AnalogReading {
    /// The conversion left-aligned to 16 bits.
    pub fn value16(&self) -> u16 {
        self.raw << 6
    }
}

/// A single-ended analog input.
pub trait AnalogSource {
    fn read(&mut self, channel: u8) -> Result<AnalogReading, AppError>;
}

/// MCP3008 exposed by the kernel `mcp320x` IIO driver.
pub struct Mcp3008 {
    device: IioDevice,
    scale_mv: f64, // millivolts per LSB
}

impl Mcp3008 {
    pub fn open(root: &Path) -> Result<Self, AppError> {
        let device = IioDevice::find(root, MCP3008_DRIVER_NAME)?;
        let scale_mv = device
            .read_f64("in_voltage_scale")
            .map_err(|e| AppError::Config(format!("read in_voltage_scale: {e}")))?
            .ok_or_else(|| AppError::Config("in_voltage_scale is empty".into()))?;
        debug!(
            "using {} at {} ({scale_mv} mV/LSB)",
            device.name(),
            device.path().display()
        );

        Ok(Self { device, scale_mv })
    }
}

impl AnalogSource for Mcp3008 {
    fn read(&mut self, channel: u8) -> Result<AnalogReading, AppError> {
        if channel >= MCP3008_CHANNELS {
            return Err(AppError::Config(format!(
                "MCP3008 channel must be 0..{MCP3008_CHANNELS}, got {channel}"
            )));
        }

        let attr = format!("in_voltage{channel}_raw");
        let raw = self.device.read_f64(&attr).map_err(|e| {
            let msg = format!("read {attr}: {e}");
            if iio::is_transient(&e) {
                SensorError::Transient(msg)
            } else {
                SensorError::Fatal(msg)
            }
        })?;
        let raw = match raw {
            Some(v) if (0.0..=f64::from(MCP3008_MAX_RAW)).contains(&v) => v as u16,
            other => {
                return Err(SensorError::Transient(format!("{attr} out of range: {other:?}")).into());
            }
        };

        Ok(AnalogReading {
            raw,
            voltage: f64::from(raw) * self.scale_mv / 1000.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_voltage_from_scale() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("iio:device0");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("name"), "mcp3008\n").unwrap();
        fs::write(dir.join("in_voltage_scale"), "3.222656250\n").unwrap();
        fs::write(dir.join("in_voltage1_raw"), "512\n").unwrap();

        let mut adc = Mcp3008::open(root.path()).unwrap();
        let reading = adc.read(1).unwrap();

        assert_eq!(reading.raw, 512);
        assert_eq!(reading.value16(), 32768);
        assert!((reading.voltage - 1.65).abs() < 1e-9);
        assert!(matches!(adc.read(8), Err(AppError::Config(_))));
        assert!(matches!(
            adc.read(2),
            Err(AppError::Sensor(SensorError::Fatal(_)))
        ));
    }
}
