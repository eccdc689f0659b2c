pub const MODEL: &str = "viam-labs:servo:pca9685";

// Chip
pub const OSCILLATOR_HZ: u32 = 25_000_000;
pub const PWM_SLOTS: u32 = 4096;
pub const MAX_DUTY: u16 = 4095;
pub const CHANNEL_COUNT: u8 = 16;
pub const MIN_PRESCALE: u32 = 3;
pub const MAX_PRESCALE: u32 = 255;
pub const OSCILLATOR_SETTLE_MS: u64 = 5;

// Defaults applied to zero-valued config fields
pub const DEFAULT_I2C_BUS: &str = "0";
pub const DEFAULT_I2C_ADDR: u8 = 0x40;
pub const DEFAULT_PWM_FREQ_HZ: u32 = 50;
pub const DEFAULT_MIN_WIDTH_US: u32 = 500; // common hobby servos
pub const DEFAULT_MAX_WIDTH_US: u32 = 2500;
pub const DEFAULT_MIN_ANGLE: i32 = 0;
pub const DEFAULT_MAX_ANGLE: i32 = 180;
