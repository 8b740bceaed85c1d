use std::{fmt, str::FromStr, time::Duration};

use rustc_hash::FxHashSet;

use crate::error::AppError;

/// Highest BCM line routed to the Raspberry Pi 40-pin header.
pub const MAX_HEADER_BCM: u32 = 27;

pub const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";
pub const DEFAULT_IIO_ROOT: &str = "/sys/bus/iio/devices";

/// Physical level of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Which physical level energizes a relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    pub fn from_active_low(active_low: bool) -> Self {
        if active_low {
            Polarity::ActiveLow
        } else {
            Polarity::ActiveHigh
        }
    }

    /// Returns `(active, inactive)` levels.
    pub fn levels(self) -> (Level, Level) {
        match self {
            Polarity::ActiveHigh => (Level::High, Level::Low),
            Polarity::ActiveLow => (Level::Low, Level::High),
        }
    }

    pub fn active_level(self) -> Level {
        self.levels().0
    }

    pub fn inactive_level(self) -> Level {
        self.levels().1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhtModel {
    Dht11,
    Dht22,
}

impl DhtModel {
    /// Shortest interval between two fresh conversions the sensor supports.
    pub fn min_sampling_period(self) -> Duration {
        match self {
            DhtModel::Dht11 => Duration::from_secs(1),
            DhtModel::Dht22 => Duration::from_secs(2),
        }
    }
}

impl FromStr for DhtModel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DHT11" => Ok(DhtModel::Dht11),
            "DHT22" => Ok(DhtModel::Dht22),
            other => Err(AppError::Config(format!(
                "sensor type must be DHT11 or DHT22, got {other}"
            ))),
        }
    }
}

impl fmt::Display for DhtModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DhtModel::Dht11 => f.write_str("DHT11"),
            DhtModel::Dht22 => f.write_str("DHT22"),
        }
    }
}

/// A header pin named the way Blinka names them (`D4`, `D17`), also accepting `GPIO4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardPin(u32);

impl BoardPin {
    pub fn bcm(self) -> u32 {
        self.0
    }
}

impl FromStr for BoardPin {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase();
        let digits = name
            .strip_prefix("GPIO")
            .or_else(|| name.strip_prefix('D'))
            .ok_or_else(|| AppError::Config(format!("unknown board pin: {s}")))?;
        let bcm: u32 = digits
            .parse()
            .map_err(|_| AppError::Config(format!("unknown board pin: {s}")))?;
        if bcm > MAX_HEADER_BCM {
            return Err(AppError::Config(format!("unknown board pin: {s}")));
        }
        Ok(BoardPin(bcm))
    }
}

impl fmt::Display for BoardPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdConfig {
    pub sensor_pin: BoardPin,
    pub sensor_model: DhtModel,
    pub relay_line: u32,
    pub threshold_celsius: f64,
    pub poll_interval: Duration,
    pub polarity: Polarity,
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.threshold_celsius.is_finite() {
            return Err(AppError::Config("threshold must be a finite number".into()));
        }
        if self.relay_line > MAX_HEADER_BCM {
            return Err(AppError::Config(format!(
                "relay pin {} is not a header BCM line",
                self.relay_line
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SequenceConfig {
    pub lines: Vec<u32>,
    pub delay: Duration,
    pub polarity: Polarity,
    pub once: bool,
}

impl SequenceConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.lines.is_empty() {
            return Err(AppError::Config("pin list is empty".into()));
        }
        let mut seen = FxHashSet::default();
        for &line in &self.lines {
            if line > MAX_HEADER_BCM {
                return Err(AppError::Config(format!(
                    "relay pin {line} is not a header BCM line"
                )));
            }
            if !seen.insert(line) {
                return Err(AppError::Config(format!(
                    "relay pin {line} is listed more than once"
                )));
            }
        }
        Ok(())
    }
}

/// Parses a comma separated BCM pin list such as `17,27,22`.
pub fn parse_pin_list(s: &str) -> Result<Vec<u32>, AppError> {
    let lines = s
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<u32>()
                .map_err(|_| AppError::Config(format!("invalid BCM pin: {p}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if lines.is_empty() {
        return Err(AppError::Config("pin list is empty".into()));
    }
    Ok(lines)
}

/// Converts a user supplied seconds value into a `Duration`.
pub fn seconds(value: f64) -> Result<Duration, AppError> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| AppError::Config(format!("invalid duration: {value}s")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_levels() {
        assert_eq!(Polarity::ActiveHigh.levels(), (Level::High, Level::Low));
        assert_eq!(Polarity::ActiveLow.levels(), (Level::Low, Level::High));
        assert_eq!(Polarity::from_active_low(true), Polarity::ActiveLow);
        assert_eq!(Polarity::from_active_low(false), Polarity::ActiveHigh);
    }

    #[test]
    fn pin_list_trims_and_skips_empty() {
        assert_eq!(parse_pin_list(" 17, 27,,22 ").unwrap(), vec![17, 27, 22]);
        assert!(parse_pin_list(",,").is_err());
        assert!(parse_pin_list("17,x").is_err());
    }

    #[test]
    fn sequence_rejects_duplicate_and_off_header_pins() {
        let mut config = SequenceConfig {
            lines: parse_pin_list("17,27,22").unwrap(),
            delay: Duration::ZERO,
            polarity: Polarity::ActiveHigh,
            once: true,
        };
        assert!(config.validate().is_ok());

        config.lines = parse_pin_list("17,17").unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("more than once"), "{err}");

        config.lines = vec![17, 28];
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("not a header BCM line"), "{err}");
    }

    #[test]
    fn board_pin_names() {
        assert_eq!("D4".parse::<BoardPin>().unwrap().bcm(), 4);
        assert_eq!("gpio17".parse::<BoardPin>().unwrap().bcm(), 17);
        assert!("D40".parse::<BoardPin>().is_err());
        assert!("SCK".parse::<BoardPin>().is_err());
    }

    #[test]
    fn dht_model_parse() {
        assert_eq!("dht22".parse::<DhtModel>().unwrap(), DhtModel::Dht22);
        assert!("DHT33".parse::<DhtModel>().is_err());
    }

    #[test]
    fn seconds_rejects_negative() {
        assert_eq!(seconds(2.5).unwrap(), Duration::from_millis(2500));
        assert!(seconds(-1.0).is_err());
        assert!(seconds(f64::NAN).is_err());
    }
}
