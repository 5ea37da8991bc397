// This file is only compiled during tests

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;

#[derive(Default)]
struct MockBus {
    address: Option<u16>,
    registers: HashMap<u8, u8>,
    writes: Vec<(u8, u8)>,
}

thread_local! {
    static MOCK_BUS: RefCell<MockBus> = RefCell::new(MockBus::default());
}

pub struct I2c {
    bus: u8,
}

impl I2c {
    pub fn with_bus(bus: u8) -> Result<Self, io::Error> {
        Ok(I2c { bus })
    }

    pub fn set_slave_address(&mut self, address: u16) -> Result<(), io::Error> {
        MOCK_BUS.with(|state| state.borrow_mut().address = Some(address));
        Ok(())
    }

    pub fn smbus_read_byte(&mut self, register: u8) -> Result<u8, io::Error> {
        Ok(get_mock_register(register))
    }

    pub fn smbus_write_byte(&mut self, register: u8, value: u8) -> Result<(), io::Error> {
        MOCK_BUS.with(|state| {
            let mut state = state.borrow_mut();
            state.registers.insert(register, value);
            state.writes.push((register, value));
        });
        log::trace!("[Mock I2C {}] 0x{:02X} <- 0x{:02X}", self.bus, register, value);
        Ok(())
    }
}

// Test helpers

pub fn get_mock_register(register: u8) -> u8 {
    MOCK_BUS.with(|state| *state.borrow().registers.get(&register).unwrap_or(&0))
}

pub fn set_mock_register(register: u8, value: u8) {
    MOCK_BUS.with(|state| {
        state.borrow_mut().registers.insert(register, value);
    });
}

pub fn get_mock_address() -> Option<u16> {
    MOCK_BUS.with(|state| state.borrow().address)
}

pub fn get_mock_writes() -> Vec<(u8, u8)> {
    MOCK_BUS.with(|state| state.borrow().writes.clone())
}

pub fn reset_mock_bus() {
    MOCK_BUS.with(|state| *state.borrow_mut() = MockBus::default());
}
