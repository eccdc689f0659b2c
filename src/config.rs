use crate::{
    calibration::ServoCalibration,
    constants::*,
    device::prescale_for,
    types::Channel,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidAddress(String),
    AddressOutOfRange(u64),
    InvalidChannel(i32),
    InvalidFrequency(i32),
    InvalidPulseWidth(i32),
    EmptyAngleRange(i32),
    UnreachableAngleRange { min: i32, max: i32 },
    DutyOutOfRange { width_us: u32, duty: u32 },
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidAddress(text) => write!(f, "invalid i2c_addr {:?}", text),
            ConfigError::AddressOutOfRange(addr) => {
                write!(f, "i2c_addr {:#x} is outside the 7-bit range", addr)
            }
            ConfigError::InvalidChannel(channel) => {
                write!(f, "channel {} must be between 0 and {}", channel, CHANNEL_COUNT - 1)
            }
            ConfigError::InvalidFrequency(hz) => {
                write!(f, "frequency_hz {} is not supported by the PCA9685 prescaler", hz)
            }
            ConfigError::InvalidPulseWidth(us) => {
                write!(f, "pulse width {}us must not be negative", us)
            }
            ConfigError::EmptyAngleRange(angle) => {
                write!(f, "min_angle_deg and max_angle_deg are both {}", angle)
            }
            ConfigError::UnreachableAngleRange { min, max } => {
                write!(f, "angle range {}..{} has no non-negative angles", min, max)
            }
            ConfigError::DutyOutOfRange { width_us, duty } => write!(
                f,
                "pulse width {}us needs duty {} which exceeds the {} slot period",
                width_us, duty, PWM_SLOTS
            ),
            ConfigError::Parse(msg) => write!(f, "couldn't parse config: {}", msg),
        }
    }
}

impl Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Attributes of one servo. Zero or empty values fall back to the defaults
/// in [`crate::constants`] when resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub i2c_bus: String,
    pub i2c_addr: String,
    pub channel: i32,
    pub frequency_hz: i32,
    pub min_angle_deg: i32,
    pub max_angle_deg: i32,
    pub starting_position_deg: u32,
    pub min_width_us: i32,
    pub max_width_us: i32,
}

/// Config with defaults applied and every value checked against the chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub i2c_bus: String,
    pub i2c_addr: u8,
    pub channel: Channel,
    pub frequency_hz: u32,
    pub calibration: ServoCalibration,
    pub starting_position: u32,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the implicit dependencies of this servo, of which there are none.
    pub fn validate(&self, _path: &str) -> Result<Vec<String>, ConfigError> {
        Ok(Vec::new())
    }

    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let i2c_bus = if self.i2c_bus.is_empty() {
            DEFAULT_I2C_BUS.to_string()
        } else {
            self.i2c_bus.clone()
        };

        let i2c_addr = if self.i2c_addr.is_empty() {
            DEFAULT_I2C_ADDR
        } else {
            parse_i2c_addr(&self.i2c_addr)?
        };

        let channel = Channel::try_from(self.channel as i64)
            .map_err(|_| ConfigError::InvalidChannel(self.channel))?;

        let frequency_hz = match self.frequency_hz {
            0 => DEFAULT_PWM_FREQ_HZ,
            hz if hz < 0 => return Err(ConfigError::InvalidFrequency(hz)),
            hz => hz as u32,
        };
        if prescale_for(frequency_hz).is_none() {
            return Err(ConfigError::InvalidFrequency(self.frequency_hz));
        }

        let min_width = width_or(self.min_width_us, DEFAULT_MIN_WIDTH_US)?;
        let max_width = width_or(self.max_width_us, DEFAULT_MAX_WIDTH_US)?;
        let min_angle = angle_or(self.min_angle_deg, DEFAULT_MIN_ANGLE);
        let max_angle = angle_or(self.max_angle_deg, DEFAULT_MAX_ANGLE);

        let calibration =
            ServoCalibration::new(frequency_hz, min_width, max_width, min_angle, max_angle)?;

        Ok(Settings {
            i2c_bus,
            i2c_addr,
            channel,
            frequency_hz,
            calibration,
            starting_position: self.starting_position_deg,
        })
    }
}

fn width_or(width: i32, default: u32) -> Result<u32, ConfigError> {
    match width {
        0 => Ok(default),
        w if w < 0 => Err(ConfigError::InvalidPulseWidth(w)),
        w => Ok(w as u32),
    }
}

fn angle_or(angle: i32, default: i32) -> i32 {
    if angle == 0 {
        default
    } else {
        angle
    }
}

/// Parses an address the way integer literals are written: `0x`, `0o`, `0b`
/// prefixes, a bare leading zero for octal, and `_` between digits.
pub fn parse_i2c_addr(text: &str) -> Result<u8, ConfigError> {
    let invalid = || ConfigError::InvalidAddress(text.to_string());
    let lower = text.to_ascii_lowercase();

    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };

    if digits.is_empty() || digits.ends_with('_') || digits.contains("__") {
        return Err(invalid());
    }
    // an underscore may follow a prefix but never lead a decimal literal
    if digits.starts_with('_') && radix == 10 {
        return Err(invalid());
    }
    let digits: String = digits.chars().filter(|&c| c != '_').collect();
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(invalid());
    }

    let value = u64::from_str_radix(&digits, radix).map_err(|_| invalid())?;
    if value > 0x7f {
        return Err(ConfigError::AddressOutOfRange(value));
    }
    Ok(value as u8)
}
