use crate::{
    config::{Config, ConfigError, Settings},
    constants::MODEL,
    device::ServoOutput,
    transport::{BusOpener, TransportError},
    types::ServoState,
};
use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub enum ServoError {
    Config(ConfigError),
    Transport(TransportError),
    SetAngle(TransportError),
    Stop(TransportError),
    DoUnimplemented,
    Task(String),
}

impl fmt::Display for ServoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServoError::Config(e) => write!(f, "invalid config: {}", e),
            ServoError::Transport(e) => write!(f, "{}", e),
            ServoError::SetAngle(e) => write!(f, "couldn't set angle: {}", e),
            ServoError::Stop(e) => write!(f, "couldn't stop servo: {}", e),
            ServoError::DoUnimplemented => write!(f, "DoCommand unimplemented"),
            ServoError::Task(msg) => write!(f, "device task failed: {}", msg),
        }
    }
}

impl Error for ServoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ServoError::Config(e) => Some(e),
            ServoError::Transport(e) | ServoError::SetAngle(e) | ServoError::Stop(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for ServoError {
    fn from(err: ConfigError) -> Self {
        ServoError::Config(err)
    }
}

impl From<TransportError> for ServoError {
    fn from(err: TransportError) -> Self {
        ServoError::Transport(err)
    }
}

impl From<tokio::task::JoinError> for ServoError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServoError::Task(err.to_string())
    }
}

/// What callers can read without waiting on the device lock.
struct Status {
    position: AtomicU32,
    moves_in_flight: AtomicUsize,
    settings: RwLock<Settings>,
}

/// Counts a move as in flight from before it queues on the device lock
/// until it returns or is dropped.
struct Moving<'a>(&'a Status);

impl<'a> Moving<'a> {
    fn begin(status: &'a Status) -> Self {
        status.moves_in_flight.fetch_add(1, Ordering::SeqCst);
        Moving(status)
    }
}

impl Drop for Moving<'_> {
    fn drop(&mut self) {
        self.0.moves_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Device<I2C> {
    output: ServoOutput<I2C>,
    settings: Settings,
}

impl<I2C, E> Device<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: fmt::Debug,
{
    /// Opens the bus without touching the chip.
    fn open<O: BusOpener<Bus = I2C>>(opener: &O, settings: Settings) -> Result<Self, ServoError> {
        let bus = opener.open(&settings.i2c_bus)?;
        let output = ServoOutput::new(
            bus,
            settings.i2c_addr,
            settings.channel,
            settings.frequency_hz,
            settings.calibration,
        )?;
        Ok(Device { output, settings })
    }

    /// Initializes the chip and moves to the starting position, which is returned.
    fn start(&mut self) -> Result<u32, ServoError> {
        self.output.init()?;

        let calibration = self.settings.calibration;
        info!(
            "Initializing servo on channel {}, minPwm {}, maxPwm {}, minAngle {}, maxAngle {}, \
             startingPosition {}",
            self.settings.channel.index(),
            calibration.min_pwm(),
            calibration.max_pwm(),
            calibration.min_angle(),
            calibration.max_angle(),
            self.settings.starting_position
        );

        self.move_to(self.settings.starting_position)
    }

    fn move_to(&mut self, angle: u32) -> Result<u32, ServoError> {
        let angle = self.output.set_angle(angle).map_err(ServoError::SetAngle)?;
        debug!("channel {} moved to {} degrees", self.output.channel().index(), angle);
        Ok(angle)
    }

    fn stop(&mut self) -> Result<(), ServoError> {
        self.output.set_duty(0).map_err(ServoError::Stop)?;
        debug!("channel {} stopped", self.output.channel().index());
        Ok(())
    }

    /// Puts the chip back to this device's frequency and `position` after
    /// another configuration touched it.
    fn restore(&mut self, position: u32) -> Result<(), ServoError> {
        self.output.init()?;
        self.move_to(position)?;
        Ok(())
    }
}

/// A servo on one PCA9685 channel.
///
/// Move, stop and reconfigure hold the device write lock for the whole I2C
/// transaction. Position, moving state and settings are read without it.
pub struct Controller<O: BusOpener> {
    name: String,
    opener: Arc<O>,
    device: Arc<RwLock<Device<O::Bus>>>,
    status: Arc<Status>,
}

impl<O: BusOpener> Controller<O> {
    pub async fn new(
        name: impl Into<String>,
        config: &Config,
        opener: O,
    ) -> Result<Self, ServoError> {
        let name = name.into();
        info!("Starting {} instance {}", MODEL, name);

        let settings = config.resolve()?;
        let opener = Arc::new(opener);
        let (device, position) = {
            let opener = Arc::clone(&opener);
            tokio::task::spawn_blocking(move || -> Result<_, ServoError> {
                let mut device = Device::open(&*opener, settings)?;
                let position = device.start()?;
                Ok((device, position))
            })
            .await??
        };

        let status = Status {
            position: AtomicU32::new(position),
            moves_in_flight: AtomicUsize::new(0),
            settings: RwLock::new(device.settings.clone()),
        };
        Ok(Controller {
            name,
            opener,
            device: Arc::new(RwLock::new(device)),
            status: Arc::new(status),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> Settings {
        self.status.settings.read().clone()
    }

    /// Reopens the bus and reinitializes the chip from `config`, then moves
    /// to the configured starting position. If the new chip setup fails
    /// partway, the previous device is reinitialized and returned to its
    /// last position before the error is reported.
    pub async fn reconfigure(&self, config: &Config) -> Result<(), ServoError> {
        let settings = config.resolve()?;
        let opener = Arc::clone(&self.opener);
        let status = Arc::clone(&self.status);
        let name = self.name.clone();

        self.with_device(move |device| {
            let mut next = Device::open(&*opener, settings)?;
            match next.start() {
                Ok(position) => {
                    *status.settings.write() = next.settings.clone();
                    status.position.store(position, Ordering::SeqCst);
                    *device = next;
                    Ok(())
                }
                Err(err) => {
                    let position = status.position.load(Ordering::SeqCst);
                    if let Err(restore) = device.restore(position) {
                        warn!("{} couldn't restore the previous device: {}", name, restore);
                    }
                    Err(err)
                }
            }
        })
        .await?;

        info!("{} reconfigured", self.name);
        Ok(())
    }

    pub async fn move_to(&self, angle: u32) -> Result<(), ServoError> {
        let _moving = Moving::begin(&self.status);
        let status = Arc::clone(&self.status);
        self.with_device(move |device| {
            let angle = device.move_to(angle)?;
            status.position.store(angle, Ordering::SeqCst);
            Ok(())
        })
        .await
    }

    pub async fn stop(&self) -> Result<(), ServoError> {
        self.with_device(|device| device.stop()).await
    }

    pub fn position(&self) -> u32 {
        self.status.position.load(Ordering::SeqCst)
    }

    pub fn is_moving(&self) -> bool {
        self.status.moves_in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn state(&self) -> ServoState {
        ServoState {
            position: self.position(),
            moving: self.is_moving(),
        }
    }

    pub async fn do_command(
        &self,
        _cmd: &Map<String, Value>,
    ) -> Result<Map<String, Value>, ServoError> {
        Err(ServoError::DoUnimplemented)
    }

    async fn with_device<T, F>(&self, f: F) -> Result<T, ServoError>
    where
        F: FnOnce(&mut Device<O::Bus>) -> Result<T, ServoError> + Send + 'static,
        T: Send + 'static,
    {
        let device = Arc::clone(&self.device);
        tokio::task::spawn_blocking(move || {
            let mut guard = device.write();
            f(&mut *guard)
        })
        .await?
    }
}
