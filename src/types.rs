use strum::IntoEnumIterator;
use strum_macros::EnumIter;

#[derive(Debug, EnumIter, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Channel {
    Led0 = 0,
    Led1 = 1,
    Led2 = 2,
    Led3 = 3,
    Led4 = 4,
    Led5 = 5,
    Led6 = 6,
    Led7 = 7,
    Led8 = 8,
    Led9 = 9,
    Led10 = 10,
    Led11 = 11,
    Led12 = 12,
    Led13 = 13,
    Led14 = 14,
    Led15 = 15,
}

impl Channel {
    pub fn index(self) -> u8 {
        self as u8
    }
}

impl From<Channel> for pwm_pca9685::Channel {
    fn from(channel: Channel) -> Self {
        use pwm_pca9685::Channel as C;
        match channel {
            Channel::Led0 => C::C0,
            Channel::Led1 => C::C1,
            Channel::Led2 => C::C2,
            Channel::Led3 => C::C3,
            Channel::Led4 => C::C4,
            Channel::Led5 => C::C5,
            Channel::Led6 => C::C6,
            Channel::Led7 => C::C7,
            Channel::Led8 => C::C8,
            Channel::Led9 => C::C9,
            Channel::Led10 => C::C10,
            Channel::Led11 => C::C11,
            Channel::Led12 => C::C12,
            Channel::Led13 => C::C13,
            Channel::Led14 => C::C14,
            Channel::Led15 => C::C15,
        }
    }
}

impl TryFrom<i64> for Channel {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Channel::iter()
            .find(|&channel| channel as i64 == value)
            .ok_or(value)
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ServoState {
    pub position: u32,
    pub moving: bool,
}
