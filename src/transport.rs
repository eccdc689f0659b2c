use embedded_hal::blocking::i2c::{Write, WriteRead};
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Open { bus: String, reason: String },
    I2c { address: u8, reason: String },
    InvalidInput(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Open { bus, reason } => {
                write!(f, "couldn't open i2c bus {}: {}", bus, reason)
            }
            TransportError::I2c { address, reason } => {
                write!(f, "i2c transfer to {:#04x} failed: {}", address, reason)
            }
            TransportError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
        }
    }
}

impl Error for TransportError {}

/// Opens an I2C bus by its identifier.
pub trait BusOpener: Send + Sync + 'static {
    type Error: fmt::Debug;
    type Bus: Write<Error = Self::Error> + WriteRead<Error = Self::Error> + Send + Sync + 'static;

    fn open(&self, bus: &str) -> Result<Self::Bus, TransportError>;
}

/// Opens `/dev/i2c-<bus>`, or `bus` itself when it is an absolute path.
#[cfg(target_os = "linux")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxI2c;

#[cfg(target_os = "linux")]
impl BusOpener for LinuxI2c {
    type Error = <linux_embedded_hal::I2cdev as Write>::Error;
    type Bus = linux_embedded_hal::I2cdev;

    fn open(&self, bus: &str) -> Result<Self::Bus, TransportError> {
        let path = device_path(bus);
        linux_embedded_hal::I2cdev::new(&path).map_err(|e| TransportError::Open {
            bus: path,
            reason: e.to_string(),
        })
    }
}

pub fn device_path(bus: &str) -> String {
    if bus.starts_with('/') {
        bus.to_string()
    } else {
        format!("/dev/i2c-{}", bus)
    }
}
