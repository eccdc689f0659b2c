use crate::{
    calibration::ServoCalibration,
    constants::*,
    transport::TransportError,
    types::Channel,
};
use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::debug;
use pwm_pca9685::{Address, Channel as PwmChannel, Error as PwmError, OutputDriver, Pca9685};
use std::fmt::Debug;
use std::thread;
use std::time::Duration;

/// Prescale register value for `frequency_hz`, or `None` when the chip can't
/// generate that frequency.
pub fn prescale_for(frequency_hz: u32) -> Option<u8> {
    if frequency_hz == 0 {
        return None;
    }
    let slots_per_second = PWM_SLOTS as u64 * frequency_hz as u64;
    let divider = (OSCILLATOR_HZ as u64 + slots_per_second / 2) / slots_per_second;
    let prescale = divider.checked_sub(1)?;
    if (MIN_PRESCALE as u64..=MAX_PRESCALE as u64).contains(&prescale) {
        Some(prescale as u8)
    } else {
        None
    }
}

fn settle() {
    thread::sleep(Duration::from_millis(OSCILLATOR_SETTLE_MS));
}

fn transport_error<E: Debug>(address: u8, err: PwmError<E>) -> TransportError {
    match err {
        PwmError::I2C(e) => TransportError::I2c {
            address,
            reason: format!("{:?}", e),
        },
        PwmError::InvalidInputData => {
            TransportError::InvalidInput(format!("rejected by PCA9685 at {:#04x}", address))
        }
    }
}

/// One servo on one channel of a PCA9685.
pub struct ServoOutput<I2C> {
    pwm: Pca9685<I2C>,
    address: u8,
    channel: Channel,
    frequency_hz: u32,
    calibration: ServoCalibration,
}

impl<I2C, E> ServoOutput<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    pub fn new(
        i2c: I2C,
        address: u8,
        channel: Channel,
        frequency_hz: u32,
        calibration: ServoCalibration,
    ) -> Result<Self, TransportError> {
        let pwm = Pca9685::new(i2c, Address::from(address))
            .map_err(|e| transport_error(address, e))?;
        Ok(ServoOutput {
            pwm,
            address,
            channel,
            frequency_hz,
            calibration,
        })
    }

    /// Turns every channel off, then sets totem-pole outputs and the
    /// prescaler and starts the oscillator. The prescaler only takes writes
    /// while the oscillator sleeps, so a running chip is put to sleep first.
    pub fn init(&mut self) -> Result<(), TransportError> {
        let prescale = prescale_for(self.frequency_hz).ok_or_else(|| {
            TransportError::InvalidInput(format!("PWM frequency {}Hz", self.frequency_hz))
        })?;
        let address = self.address;
        let err = |e| transport_error(address, e);

        self.pwm.set_channel_on_off(PwmChannel::All, 0, 0).map_err(err)?;
        self.pwm.disable().map_err(err)?;
        self.pwm.set_output_driver(OutputDriver::TotemPole).map_err(err)?;
        self.pwm.set_prescale(prescale).map_err(err)?;
        self.pwm.enable().map_err(err)?;
        settle();

        debug!(
            "PCA9685 at {:#04x} running at {}Hz, prescale {}",
            address, self.frequency_hz, prescale
        );
        Ok(())
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn calibration(&self) -> &ServoCalibration {
        &self.calibration
    }

    /// Returns the angle that was actually commanded after clamping.
    pub fn set_angle(&mut self, angle: u32) -> Result<u32, TransportError> {
        let angle = self.calibration.clamp(angle);
        let duty = self.calibration.duty(angle);
        self.set_duty(duty)?;
        Ok(angle)
    }

    pub fn set_duty(&mut self, duty: u16) -> Result<(), TransportError> {
        let address = self.address;
        self.pwm
            .set_channel_on_off(self.channel.into(), 0, duty.min(MAX_DUTY))
            .map_err(|e| transport_error(address, e))
    }
}
