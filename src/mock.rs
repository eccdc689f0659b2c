//! In-memory PCA9685 stand-in for tests.

use crate::transport::{BusOpener, TransportError};
use crate::types::Channel;
use embedded_hal::blocking::i2c::{Write, WriteRead};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const MODE1: u8 = 0x00;
pub const LED0_ON_L: u8 = 0x06;
pub const ALL_LED_ON_L: u8 = 0xfa;
pub const PRESCALE: u8 = 0xfe;
pub const MODE1_SLEEP: u8 = 0x10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockError;

struct MockState {
    registers: Vec<u8>,
    writes: Vec<(u8, Vec<u8>)>,
    failing: bool,
    fail_next_write_to: Option<u8>,
    write_delay: Duration,
}

/// Records every write and keeps a register file with auto-increment.
/// Writes to the ALL_LED block land in every channel, as on the chip.
#[derive(Clone)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
}

impl MockBus {
    pub fn new() -> Self {
        let mut registers = vec![0u8; 256];
        // power-on: sleeping, responds to all-call
        registers[MODE1 as usize] = 0x11;
        MockBus {
            state: Arc::new(Mutex::new(MockState {
                registers,
                writes: Vec::new(),
                failing: false,
                fail_next_write_to: None,
                write_delay: Duration::ZERO,
            })),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    /// Fails the next write that starts at `register`, once.
    pub fn fail_next_write_to(&self, register: u8) {
        self.state.lock().fail_next_write_to = Some(register);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        self.state.lock().write_delay = delay;
    }

    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.state.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    pub fn register(&self, register: u8) -> u8 {
        self.state.lock().registers[register as usize]
    }

    pub fn is_sleeping(&self) -> bool {
        self.register(MODE1) & MODE1_SLEEP != 0
    }

    /// The 12-bit OFF count of `channel`.
    pub fn off_count(&self, channel: Channel) -> u16 {
        let state = self.state.lock();
        let base = (LED0_ON_L + 4 * channel.index()) as usize;
        state.registers[base + 2] as u16 | (((state.registers[base + 3] & 0x0f) as u16) << 8)
    }
}

impl Write for MockBus {
    type Error = MockError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        let delay = self.state.lock().write_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.state.lock();
        if state.failing {
            return Err(MockError);
        }
        let (&register, values) = match bytes.split_first() {
            Some(split) => split,
            None => return Ok(()),
        };
        if state.fail_next_write_to == Some(register) {
            state.fail_next_write_to = None;
            return Err(MockError);
        }

        state.writes.push((address, bytes.to_vec()));
        for (offset, &value) in values.iter().enumerate() {
            let index = (register as usize + offset) % 256;
            state.registers[index] = value;
            if (ALL_LED_ON_L as usize..ALL_LED_ON_L as usize + 4).contains(&index) {
                let slot = index - ALL_LED_ON_L as usize;
                for channel in 0..16 {
                    state.registers[LED0_ON_L as usize + 4 * channel + slot] = value;
                }
            }
        }
        Ok(())
    }
}

impl WriteRead for MockBus {
    type Error = MockError;

    fn write_read(
        &mut self,
        _address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        let state = self.state.lock();
        if state.failing {
            return Err(MockError);
        }
        let register = bytes.first().copied().unwrap_or(0) as usize;
        for (offset, slot) in buffer.iter_mut().enumerate() {
            *slot = state.registers[(register + offset) % 256];
        }
        Ok(())
    }
}

/// Hands out clones of one [`MockBus`] and remembers which buses were asked for.
#[derive(Clone)]
pub struct MockOpener {
    pub bus: MockBus,
    opened: Arc<Mutex<Vec<String>>>,
    refuse: Arc<Mutex<bool>>,
}

impl MockOpener {
    pub fn new() -> Self {
        MockOpener {
            bus: MockBus::new(),
            opened: Arc::new(Mutex::new(Vec::new())),
            refuse: Arc::new(Mutex::new(false)),
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }

    pub fn set_refusing(&self, refuse: bool) {
        *self.refuse.lock() = refuse;
    }
}

impl BusOpener for MockOpener {
    type Error = MockError;
    type Bus = MockBus;

    fn open(&self, bus: &str) -> Result<Self::Bus, TransportError> {
        if *self.refuse.lock() {
            return Err(TransportError::Open {
                bus: bus.to_string(),
                reason: "no such device".into(),
            });
        }
        self.opened.lock().push(bus.to_string());
        Ok(self.bus.clone())
    }
}
