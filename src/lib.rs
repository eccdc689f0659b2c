mod calibration;
mod config;
mod constants;
mod controller;
mod device;
mod transport;
mod types;

#[cfg(test)]
mod mock;

pub use calibration::ServoCalibration;
pub use config::{parse_i2c_addr, Config, ConfigError, Settings};
pub use controller::{Controller, ServoError};
pub use device::{prescale_for, ServoOutput};
pub use transport::{device_path, BusOpener, TransportError};
pub use types::{Channel, ServoState};

#[cfg(target_os = "linux")]
pub use transport::LinuxI2c;

// Re-export commonly used items
pub use constants::{DEFAULT_I2C_ADDR, DEFAULT_PWM_FREQ_HZ, MODEL};
