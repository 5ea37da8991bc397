use log::debug;

use crate::calibration::{LegTable, ServoRange};
use crate::error::{ConfigError, DriverError};
use crate::kinematics::JointAngles;
use crate::leg::Leg;
use crate::pca9685::PwmDriver;

/// Anything that can put a leg's joints at the given ideal angles.
pub trait LegActuator {
    /// Applies calibration and drives both joints of `leg`. Out of travel
    /// angles are clamped, never rejected.
    fn set_leg_angles(&mut self, leg: Leg, angles: JointAngles) -> Result<(), DriverError>;
}

/// Pulse widths at the two ends of the servo travel (microseconds).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseRange {
    pub min_us: f64,
    pub max_us: f64,
}

impl PulseRange {
    pub fn new(min_us: f64, max_us: f64) -> Result<Self, ConfigError> {
        if !(min_us.is_finite() && max_us.is_finite()) || min_us <= 0.0 || min_us >= max_us {
            return Err(ConfigError::InvalidRange {
                name: "servo pulse",
                min: min_us,
                max: max_us,
            });
        }
        Ok(Self { min_us, max_us })
    }
}

/// Servo-driven legs behind a PWM driver.
pub struct ServoLegs<D: PwmDriver> {
    driver: D,
    table: LegTable,
    range: ServoRange,
    pulse: PulseRange,
    clamped: u64,
}

impl<D: PwmDriver> ServoLegs<D> {
    pub fn new(driver: D, table: LegTable, range: ServoRange, pulse: PulseRange) -> Self {
        Self {
            driver,
            table,
            range,
            pulse,
            clamped: 0,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Number of joint commands clamped to the servo travel so far.
    pub fn clamp_count(&self) -> u64 {
        self.clamped
    }

    /// Linear map from servo travel to pulse width, clamped to the pulse range.
    pub fn angle_to_pulse_us(&self, angle: f64) -> f64 {
        let fraction = (angle - self.range.min()) / self.range.span();
        let pulse_us = self.pulse.min_us + fraction * (self.pulse.max_us - self.pulse.min_us);
        pulse_us.clamp(self.pulse.min_us, self.pulse.max_us)
    }

    fn write_angle(&mut self, channel: u8, angle: f64) -> Result<(), DriverError> {
        let pulse_us = self.angle_to_pulse_us(angle);
        let duty_cycle = pulse_us / self.driver.period_us();
        self.driver.set_duty_cycle(channel, duty_cycle)
    }

    /// Drives one channel to an actuator angle, bypassing the leg table.
    /// Used when tuning the calibration offsets.
    pub fn set_servo_angle(&mut self, channel: u8, angle: f64) -> Result<f64, DriverError> {
        let (angle, clamped) = self.range.clamp(angle);
        if clamped {
            self.clamped += 1;
        }
        self.write_angle(channel, angle)?;
        Ok(angle)
    }

    /// Turns every servo output off.
    pub fn relax(&mut self) -> Result<(), DriverError> {
        self.driver.disable()
    }
}

impl<D: PwmDriver> LegActuator for ServoLegs<D> {
    fn set_leg_angles(&mut self, leg: Leg, angles: JointAngles) -> Result<(), DriverError> {
        let command = self.table.command(leg, angles, &self.range);
        self.clamped += u64::from(command.clamped);

        debug!(
            "{} ({}) -> ch{} {:.1}°, ch{} {:.1}°",
            leg, angles, command.hip_channel, command.hip, command.knee_channel, command.knee
        );

        self.write_angle(command.hip_channel, command.hip)?;
        self.write_angle(command.knee_channel, command.knee)
    }
}
