use std::{fs, io, path::Path};

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::error::AppError;

pub const DEFAULT_CALIBRATION_FILE: &str = "calibracion.json";

/// Reference buffer solutions used to calibrate a pH probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Buffer {
    Ph4,
    Ph7,
    Ph10,
}

impl Buffer {
    pub const ALL: [Buffer; 3] = [Buffer::Ph4, Buffer::Ph7, Buffer::Ph10];

    pub fn nominal_ph(self) -> f64 {
        match self {
            Buffer::Ph4 => 4.0,
            Buffer::Ph7 => 7.0,
            Buffer::Ph10 => 10.0,
        }
    }
}

/// Probe voltage measured in each buffer, `None` until recorded.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub struct Calibration {
    #[serde(rename = "pH4")]
    pub ph4: Option<f64>,
    #[serde(rename = "pH7")]
    pub ph7: Option<f64>,
    #[serde(rename = "pH10")]
    pub ph10: Option<f64>,
}

impl Calibration {
    /// Loads a calibration file. A missing file yields an empty calibration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(AppError::Calibration(format!(
                    "Failed to read calibration: {e}"
                )));
            }
        };
        serde_json::from_str(&contents)
            .map_err(|e| AppError::Calibration(format!("Invalid calibration json: {e}")))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AppError> {
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser)
            .map_err(|e| AppError::Calibration(format!("Failed to encode calibration: {e}")))?;
        fs::write(&path, buf)
            .map_err(|e| AppError::Calibration(format!("Failed to write calibration: {e}")))?;
        info!("calibration saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn get(&self, buffer: Buffer) -> Option<f64> {
        match buffer {
            Buffer::Ph4 => self.ph4,
            Buffer::Ph7 => self.ph7,
            Buffer::Ph10 => self.ph10,
        }
    }

    pub fn set(&mut self, buffer: Buffer, voltage: f64) {
        let slot = match buffer {
            Buffer::Ph4 => &mut self.ph4,
            Buffer::Ph7 => &mut self.ph7,
            Buffer::Ph10 => &mut self.ph10,
        };
        *slot = Some(voltage);
    }

    pub fn is_complete(&self) -> bool {
        Buffer::ALL.iter().all(|b| self.get(*b).is_some())
    }

    /// Estimates pH from a probe voltage with a line through the pH 4 and
    /// pH 7 points. `None` while uncalibrated or if both points coincide.
    pub fn ph(&self, voltage: f64) -> Option<f64> {
        if !self.is_complete() {
            return None;
        }
        let (v4, v7) = (self.ph4?, self.ph7?);
        if v7 == v4 {
            return None;
        }

        let slope = (Buffer::Ph7.nominal_ph() - Buffer::Ph4.nominal_ph()) / (v7 - v4);
        let intercept = Buffer::Ph7.nominal_ph() - slope * v7;
        Some(slope * voltage + intercept)
    }
}
