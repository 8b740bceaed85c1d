//! Minimal access to Linux Industrial I/O devices through sysfs.
//!
//! Each IIO device is a directory (`iio:deviceN`) holding a `name` file and
//! one file per channel attribute. Reading an attribute triggers a fresh
//! conversion in drivers such as `dht11` and `mcp320x`, so attributes are
//! kept open and re-read from offset zero.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::AppError;

// Linux errno values surfaced by sensor drivers on a bad conversion.
const EIO: i32 = 5;
const EAGAIN: i32 = 11;
const EBUSY: i32 = 16;
const ETIMEDOUT: i32 = 110;

#[derive(Debug, Clone)]
pub struct IioDevice {
    path: PathBuf,
    name: String,
}

impl IioDevice {
    /// Lists IIO devices under `root` whose `name` satisfies `accept`.
    pub fn scan(root: &Path, accept: impl Fn(&str) -> bool) -> Result<Vec<IioDevice>, AppError> {
        let entries = fs::read_dir(root).map_err(|e| {
            AppError::Config(format!("cannot list IIO devices in {}: {e}", root.display()))
        })?;

        let mut devices = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let Ok(name) = fs::read_to_string(path.join("name")) else {
                continue;
            };
            let name = name.trim().to_string();
            if accept(&name) {
                devices.push(IioDevice { path, name });
            }
        }
        devices.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(devices)
    }

    /// Finds the single device called `name`.
    pub fn find(root: &Path, name: &str) -> Result<IioDevice, AppError> {
        Self::scan(root, |n| n == name)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::Config(format!("no IIO device named {name} in {}", root.display()))
            })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_attribute(&self, attr: &str) -> bool {
        self.path.join(attr).is_file()
    }

    pub fn open_attribute(&self, attr: &str) -> io::Result<Attribute> {
        let path = self.path.join(attr);
        let file = File::open(&path)?;
        Ok(Attribute { file, path })
    }

    /// One-shot read of a numeric attribute.
    pub fn read_f64(&self, attr: &str) -> io::Result<Option<f64>> {
        self.open_attribute(attr)?.read_f64()
    }
}

/// An open attribute file.
#[derive(Debug)]
pub struct Attribute {
    file: File,
    path: PathBuf,
}

impl Attribute {
    pub fn read_raw(&mut self) -> io::Result<String> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buf = String::new();
        self.file.read_to_string(&mut buf)?;
        Ok(buf)
    }

    /// Reads the attribute as a number. An empty attribute reads as `None`.
    pub fn read_f64(&mut self) -> io::Result<Option<f64>> {
        let raw = self.read_raw()?;
        let value = raw.trim();
        if value.is_empty() {
            return Ok(None);
        }
        value.parse::<f64>().map(Some).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: {value:?}: {e}", self.path.display()),
            )
        })
    }
}

/// Whether a read error is a bad conversion worth retrying rather than a
/// missing or inaccessible device.
pub fn is_transient(err: &io::Error) -> bool {
    if let Some(code) = err.raw_os_error() {
        return matches!(code, EIO | EAGAIN | EBUSY | ETIMEDOUT);
    }
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::InvalidData
    )
}
