use crate::config::ConfigError;
use crate::constants::{MAX_DUTY, PWM_SLOTS};

/// Linear mapping from an angle range onto a duty-cycle range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoCalibration {
    min_pwm: u16,
    max_pwm: u16,
    min_angle: i32,
    max_angle: i32,
}

impl ServoCalibration {
    pub fn new(
        frequency_hz: u32,
        min_width_us: u32,
        max_width_us: u32,
        min_angle: i32,
        max_angle: i32,
    ) -> Result<Self, ConfigError> {
        if min_angle == max_angle {
            return Err(ConfigError::EmptyAngleRange(min_angle));
        }
        if min_angle.max(max_angle) < 0 {
            return Err(ConfigError::UnreachableAngleRange {
                min: min_angle,
                max: max_angle,
            });
        }

        // 4096 slots per period, frequency periods per second
        let us_per_slot = 1_000_000.0 / (frequency_hz as f64 * PWM_SLOTS as f64);

        Ok(ServoCalibration {
            min_pwm: width_to_duty(min_width_us, us_per_slot)?,
            max_pwm: width_to_duty(max_width_us, us_per_slot)?,
            min_angle,
            max_angle,
        })
    }

    pub fn min_pwm(&self) -> u16 {
        self.min_pwm
    }

    pub fn max_pwm(&self) -> u16 {
        self.max_pwm
    }

    pub fn min_angle(&self) -> i32 {
        self.min_angle
    }

    pub fn max_angle(&self) -> i32 {
        self.max_angle
    }

    /// Clamps `angle` into the calibrated range.
    pub fn clamp(&self, angle: u32) -> u32 {
        let low = self.min_angle.min(self.max_angle) as i64;
        let high = self.min_angle.max(self.max_angle) as i64;
        // high >= 0, so the result is never negative for a non-negative input
        (angle as i64).clamp(low, high) as u32
    }

    pub fn duty(&self, angle: u32) -> u16 {
        let angle = self.clamp(angle) as i64;
        let (min_angle, max_angle) = (self.min_angle as i64, self.max_angle as i64);
        let (min_pwm, max_pwm) = (self.min_pwm as i64, self.max_pwm as i64);

        let duty = (angle - min_angle) * (max_pwm - min_pwm) / (max_angle - min_angle) + min_pwm;
        duty.clamp(0, MAX_DUTY as i64) as u16
    }
}

fn width_to_duty(width_us: u32, us_per_slot: f64) -> Result<u16, ConfigError> {
    let duty = (width_us as f64 / us_per_slot) as u32;
    if duty > MAX_DUTY as u32 {
        return Err(ConfigError::DutyOutOfRange { width_us, duty });
    }
    Ok(duty as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hobby_servo() -> ServoCalibration {
        ServoCalibration::new(50, 500, 2500, 0, 180).unwrap()
    }

    #[test]
    fn pulse_widths_convert_to_slots() {
        let calibration = hobby_servo();
        // 1_000_000 / (50 * 4096) = 4.8828125us per slot
        assert_eq!(calibration.min_pwm(), 102);
        assert_eq!(calibration.max_pwm(), 512);
    }

    #[test]
    fn angles_scale_linearly() {
        let calibration = hobby_servo();
        assert_eq!(calibration.duty(0), 102);
        assert_eq!(calibration.duty(90), 307);
        assert_eq!(calibration.duty(180), 512);
        assert_eq!(calibration.duty(45), 204);
    }

    #[test]
    fn out_of_range_angles_are_clamped() {
        let calibration = ServoCalibration::new(50, 500, 2500, 10, 170).unwrap();
        assert_eq!(calibration.clamp(0), 10);
        assert_eq!(calibration.clamp(200), 170);
        assert_eq!(calibration.duty(0), calibration.duty(10));
        assert_eq!(calibration.duty(200), 512);
    }

    #[test]
    fn negative_minimum_angle_shifts_the_range() {
        let calibration = ServoCalibration::new(50, 1000, 2000, -90, 90).unwrap();
        assert_eq!(calibration.min_pwm(), 204);
        assert_eq!(calibration.max_pwm(), 409);
        // 0 degrees is the midpoint
        assert_eq!(calibration.duty(0), 306);
        assert_eq!(calibration.duty(90), 409);
    }

    #[test]
    fn reversed_angle_range_inverts_the_mapping() {
        let calibration = ServoCalibration::new(50, 500, 2500, 180, 0).unwrap();
        // min_angle = 180 maps to min_pwm
        assert_eq!(calibration.duty(180), 102);
        assert_eq!(calibration.duty(0), 512);
    }

    #[test]
    fn widths_longer_than_the_period_are_rejected() {
        assert_eq!(
            ServoCalibration::new(50, 500, 25_000, 0, 180),
            Err(ConfigError::DutyOutOfRange { width_us: 25_000, duty: 5120 })
        );
    }
}
