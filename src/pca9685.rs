use std::thread;
use std::time::Duration;

use log::{debug, info};

// Use rppal in production
#[cfg(not(test))]
use rppal::i2c::I2c;

// Mock I2C bus for testing
#[cfg(test)]
use crate::mocks::mock_i2c::I2c;

use crate::calibration::CHANNEL_COUNT;
use crate::error::DriverError;

/// Internal oscillator of the PCA9685 (Hz)
const OSCILLATOR_HZ: f64 = 25_000_000.0;
/// Steps per PWM period
const RESOLUTION: f64 = 4096.0;

// PCA9685 register addresses
const MODE1: u8 = 0x00;
const MODE2: u8 = 0x01;
const LED0_ON_L: u8 = 0x06;
const ALL_LED_OFF_H: u8 = 0xFD;
const PRESCALE: u8 = 0xFE;

// MODE1 / MODE2 bits
const RESTART: u8 = 0x80;
const AUTO_INCREMENT: u8 = 0x20;
const SLEEP: u8 = 0x10;
const ALLCALL: u8 = 0x01;
const OUTDRV: u8 = 0x04;
/// Full-off bit in the LEDn_OFF_H registers
const FULL_OFF: u8 = 0x10;

/// A multi-channel PWM output taking normalized duty cycles.
pub trait PwmDriver {
    /// Sets the duty cycle (0.0 to 1.0) of one output channel.
    fn set_duty_cycle(&mut self, channel: u8, duty_cycle: f64) -> Result<(), DriverError>;

    /// Period of the PWM signal in microseconds.
    fn period_us(&self) -> f64;

    /// Turns every output off.
    fn disable(&mut self) -> Result<(), DriverError>;
}

/// Prescaler value for the requested output frequency.
pub fn prescale_for(frequency_hz: f64) -> u8 {
    let prescale = (OSCILLATOR_HZ / RESOLUTION / frequency_hz).round() - 1.0;
    prescale.clamp(3.0, 255.0) as u8
}

/// Converts a duty cycle to the 12-bit OFF tick, the ON tick being 0.
pub fn duty_to_ticks(duty_cycle: f64) -> u16 {
    (duty_cycle.clamp(0.0, 1.0) * RESOLUTION)
        .round()
        .min(RESOLUTION - 1.0) as u16
}

/// 16-channel, 12-bit PWM driver on the I2C bus.
pub struct Pca9685 {
    i2c: I2c,
    frequency_hz: f64,
}

impl Pca9685 {
    /// Opens the driver on the given bus and address and sets the PWM frequency.
    pub fn new(bus: u8, address: u16, frequency_hz: f64) -> Result<Self, DriverError> {
        let mut i2c = I2c::with_bus(bus).map_err(DriverError::bus)?;
        i2c.set_slave_address(address).map_err(DriverError::bus)?;

        let mut pca = Self {
            i2c,
            frequency_hz,
        };
        pca.reset()?;
        pca.set_frequency(frequency_hz)?;

        info!(
            "PCA9685 at 0x{:02X} on bus {} running at {:.0} Hz",
            address, bus, frequency_hz
        );
        Ok(pca)
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), DriverError> {
        self.i2c
            .smbus_write_byte(register, value)
            .map_err(DriverError::bus)
    }

    fn read(&mut self, register: u8) -> Result<u8, DriverError> {
        self.i2c.smbus_read_byte(register).map_err(DriverError::bus)
    }

    /// All outputs off, totem pole outputs, oscillator running.
    fn reset(&mut self) -> Result<(), DriverError> {
        self.write(ALL_LED_OFF_H, FULL_OFF)?;
        self.write(MODE2, OUTDRV)?;
        self.write(MODE1, ALLCALL)?;
        thread::sleep(Duration::from_millis(5));

        let mode1 = self.read(MODE1)? & !SLEEP;
        self.write(MODE1, mode1)?;
        thread::sleep(Duration::from_millis(5));
        Ok(())
    }

    /// The prescaler can only be written while the oscillator sleeps.
    pub fn set_frequency(&mut self, frequency_hz: f64) -> Result<(), DriverError> {
        let prescale = prescale_for(frequency_hz);
        let old_mode = self.read(MODE1)?;

        self.write(MODE1, (old_mode & !RESTART) | SLEEP)?;
        self.write(PRESCALE, prescale)?;
        self.write(MODE1, old_mode)?;
        thread::sleep(Duration::from_millis(5));
        self.write(MODE1, old_mode | RESTART | AUTO_INCREMENT)?;

        self.frequency_hz = frequency_hz;
        debug!("PCA9685 prescale {} for {:.1} Hz", prescale, frequency_hz);
        Ok(())
    }

    /// Sets the ON and OFF ticks (0..4095) of one channel.
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), DriverError> {
        if channel >= CHANNEL_COUNT {
            return Err(DriverError::InvalidChannel(channel));
        }

        let base = LED0_ON_L + 4 * channel;
        let [on_l, on_h] = (on & 0x0FFF).to_le_bytes();
        let [off_l, off_h] = (off & 0x0FFF).to_le_bytes();

        self.write(base, on_l)?;
        self.write(base + 1, on_h)?;
        self.write(base + 2, off_l)?;
        self.write(base + 3, off_h)?;
        Ok(())
    }
}

impl PwmDriver for Pca9685 {
    fn set_duty_cycle(&mut self, channel: u8, duty_cycle: f64) -> Result<(), DriverError> {
        self.set_pwm(channel, 0, duty_to_ticks(duty_cycle))
    }

    fn period_us(&self) -> f64 {
        1_000_000.0 / self.frequency_hz
    }

    fn disable(&mut self) -> Result<(), DriverError> {
        self.write(ALL_LED_OFF_H, FULL_OFF)
    }
}

impl Drop for Pca9685 {
    fn drop(&mut self) {
        // Let the servos go limp when the controller goes away
        let _ = self.disable();
    }
}
