//! Error types for the quadruped controller.

use thiserror::Error;

use crate::leg::Leg;

/// Failures of the two-link solver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinematicsError {
    /// The foot target lies outside the annulus the leg can reach.
    #[error(
        "target ({x:.1}, {y:.1}) is unreachable: distance {distance:.2} not in [{min:.2}, {max:.2}]"
    )]
    Unreachable {
        x: f64,
        y: f64,
        distance: f64,
        min: f64,
        max: f64,
    },

    /// A link length is zero, negative or not finite.
    #[error("link {name} must be a positive length, got {length}")]
    InvalidLink { name: &'static str, length: f64 },
}

/// Configuration faults. These are detected when the leg table or robot
/// configuration is built, never in the middle of a gait.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("leg {0} appears more than once in the calibration table")]
    DuplicateLeg(Leg),

    #[error("leg {0} has no calibration entry")]
    MissingLeg(Leg),

    #[error("channel {channel} of leg {leg} is out of range (0..{limit})")]
    InvalidChannel { leg: Leg, channel: u8, limit: u8 },

    #[error("channel {channel} is assigned to both {first} and {second}")]
    DuplicateChannel { channel: u8, first: Leg, second: Leg },

    #[error("invalid range for {name}: [{min}, {max}]")]
    InvalidRange {
        name: &'static str,
        min: f64,
        max: f64,
    },

    #[error("step period must be a non-negative duration in seconds, got {0}")]
    InvalidPeriod(f64),

    #[error("trajectory samples must be in 1..={max}, got {got}")]
    InvalidSamples { got: usize, max: usize },

    #[error("{0} must be a finite number")]
    NonFinite(&'static str),

    #[error(transparent)]
    Geometry(#[from] KinematicsError),
}

/// Errors from the PWM channel driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("PWM channel {0} is out of range (0..16)")]
    InvalidChannel(u8),

    #[error("I2C bus error: {0}")]
    Bus(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DriverError {
    /// Wraps any bus level error.
    pub fn bus<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Bus(Box::new(err))
    }
}

/// Unknown leg key given on the command line or in a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown leg '{0}', expected one of FL, FR, RL, RR")]
pub struct ParseLegError(pub String);
