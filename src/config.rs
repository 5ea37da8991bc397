use std::time::Duration;

use nalgebra::Point2;

use crate::calibration::{JointCalibration, LegCalibration, LegTable, ServoRange};
use crate::error::ConfigError;
use crate::kinematics::{Elbow, LegGeometry};
use crate::leg::Leg;
use crate::trajectory::GaitParams;

// ** LEG GEOMETRY ** //

/// Femur (hip to knee) and tibia (knee to foot) lengths, mm.
pub const FEMUR_LENGTH_MM: f64 = 100.0;
pub const TIBIA_LENGTH_MM: f64 = 100.0;

/// Default standing foot position in the hip frame (mm). Negative y is below the hip.
pub const STAND_X: f64 = 0.0;
pub const STAND_Y: f64 = -160.0;

// ** PCA9685 CONFIGURATION ** //

/// I2C bus and address of the PWM driver
pub const PCA9685_BUS: u8 = 1;
pub const PCA9685_ADDRESS: u16 = 0x40;
/// Servo PWM frequency (Hz)
pub const PWM_FREQUENCY_HZ: f64 = 60.0;
/// Servo pulse width range (microseconds).
/// 100 and 600 ticks of the 4096 step period at 60 Hz.
pub const SERVO_MIN_PULSE_US: f64 = 407.0;
pub const SERVO_MAX_PULSE_US: f64 = 2441.0;
/// Mechanical travel of the servos (degrees)
pub const SERVO_MIN_ANGLE: f64 = 0.0;
pub const SERVO_MAX_ANGLE: f64 = 180.0;

// ** LEG TABLE ** //

/// (hip, knee) channels per leg
pub const CHANNELS_FL: (u8, u8) = (0, 1);
pub const CHANNELS_FR: (u8, u8) = (2, 3);
pub const CHANNELS_RL: (u8, u8) = (4, 5);
pub const CHANNELS_RR: (u8, u8) = (6, 7);

/// Left servos read the joint angle directly around 180°, right servos are
/// mounted mirrored and count down from 0°.
// Knee offsets assume the knee angle relative to the thigh, not the absolute shin angle (hence not ±90°)
pub const LEFT_OFFSETS: (f64, f64) = (180.0, 180.0);
pub const RIGHT_OFFSETS: (f64, f64) = (0.0, 0.0);

// ** GAIT CONFIGURATION ** //

/// Samples per swing or stance primitive (N, commanded as N + 1 points)
pub const TRAJECTORY_SAMPLES: usize = 20;
/// Upper bound on the samples per primitive
pub const MAX_TRAJECTORY_SAMPLES: usize = 10_000;
/// Forward step length (mm)
pub const STEP_LENGTH_MM: f64 = 60.0;
/// Foot lift during swing (mm)
pub const LIFT_HEIGHT_MM: f64 = 35.0;
/// Duration of one swing or stance primitive (seconds)
pub const STEP_PERIOD_SECS: f64 = 0.35;
/// Pause after the stand pose so the servos settle
pub const STAND_SETTLE_MS: u64 = 300;

pub fn default_leg_calibration() -> [(Leg, LegCalibration); 4] {
    let left = |(hip, knee): (u8, u8)| {
        LegCalibration::new(
            JointCalibration::new(hip, LEFT_OFFSETS.0, false),
            JointCalibration::new(knee, LEFT_OFFSETS.1, false),
        )
    };
    let right = |(hip, knee): (u8, u8)| {
        LegCalibration::new(
            JointCalibration::new(hip, RIGHT_OFFSETS.0, true),
            JointCalibration::new(knee, RIGHT_OFFSETS.1, true),
        )
    };

    [
        (Leg::FrontLeft, left(CHANNELS_FL)),
        (Leg::FrontRight, right(CHANNELS_FR)),
        (Leg::RearLeft, left(CHANNELS_RL)),
        (Leg::RearRight, right(CHANNELS_RR)),
    ]
}

/// Everything the controller needs, fixed for the life of the program.
#[derive(Clone, Debug, PartialEq)]
pub struct RobotConfig {
    pub geometry: LegGeometry,
    pub legs: LegTable,
    pub servo_range: ServoRange,
    pub stand: Point2<f64>,
    pub gait: GaitParams,
    pub elbow: Elbow,
    pub settle: Duration,
}

impl RobotConfig {
    /// Validates the parts against each other. The stand pose must be reachable.
    pub fn new(
        geometry: LegGeometry,
        legs: LegTable,
        servo_range: ServoRange,
        stand: Point2<f64>,
        gait: GaitParams,
        elbow: Elbow,
    ) -> Result<Self, ConfigError> {
        if !(stand.x.is_finite() && stand.y.is_finite()) {
            return Err(ConfigError::NonFinite("stand pose"));
        }
        geometry.inverse(stand, elbow)?;

        Ok(Self {
            geometry,
            legs,
            servo_range,
            stand,
            gait,
            elbow,
            settle: Duration::from_millis(STAND_SETTLE_MS),
        })
    }

    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(
            LegGeometry::new(FEMUR_LENGTH_MM, TIBIA_LENGTH_MM)?,
            LegTable::new(&default_leg_calibration())?,
            ServoRange::new(SERVO_MIN_ANGLE, SERVO_MAX_ANGLE)?,
            Point2::new(STAND_X, STAND_Y),
            GaitParams::default(),
            Elbow::KneeDown,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::JointAngles;

    #[test]
    fn test_defaults_are_consistent() -> Result<(), ConfigError> {
        let config = RobotConfig::with_defaults()?;

        assert_eq!(config.geometry.max_reach(), 200.0);
        assert_eq!(config.gait.samples, TRAJECTORY_SAMPLES);

        // Stand pose must be inside the servo travel on every leg
        let angles = config.geometry.inverse(config.stand, config.elbow)?;
        for (leg, _) in config.legs.iter() {
            let command = config.legs.command(leg, angles, &config.servo_range);
            assert_eq!(command.clamped, 0, "{} clamps at stand", leg);
        }
        Ok(())
    }

    #[test]
    fn test_stand_servo_angles_recover_relative_knee() -> Result<(), ConfigError> {
        let config = RobotConfig::with_defaults()?;
        let angles = config.geometry.inverse(config.stand, config.elbow)?;

        for (leg, calibration) in config.legs.iter() {
            let command = config.legs.command(leg, angles, &config.servo_range);
            let knee = calibration.knee.to_joint(command.knee);
            let hip = calibration.hip.to_joint(command.hip);
            assert!((knee - angles.knee).abs() < 1e-9, "{} knee", leg);

            // The recovered pair puts the foot back on the stand pose
            let foot = config.geometry.forward(JointAngles::new(hip, knee));
            assert!((foot - config.stand).norm() < 1e-9, "{} foot", leg);
        }
        Ok(())
    }

    #[test]
    fn test_unreachable_stand_rejected() -> Result<(), ConfigError> {
        let result = RobotConfig::new(
            LegGeometry::new(50.0, 50.0)?,
            LegTable::new(&default_leg_calibration())?,
            ServoRange::new(0.0, 180.0)?,
            Point2::new(STAND_X, STAND_Y),
            GaitParams::default(),
            Elbow::KneeDown,
        );
        assert!(matches!(result, Err(ConfigError::Geometry(_))));
        Ok(())
    }
}
