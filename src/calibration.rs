//! Per-leg actuator calibration.
//!
//! Maps the ideal joint angles produced by the solver onto the angle each
//! physically mounted servo expects: `offset + theta`, or `offset - theta` when
//! the servo is mounted mirrored. The table is indexed by [`Leg`], built and
//! validated once at startup.

use std::fmt;

use log::warn;

use crate::error::ConfigError;
use crate::kinematics::JointAngles;
use crate::leg::Leg;

/// Number of output channels on the PWM driver.
pub const CHANNEL_COUNT: u8 = 16;

/// One of the two actuated joints of a leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Joint {
    Hip,
    Knee,
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Joint::Hip => write!(f, "hip"),
            Joint::Knee => write!(f, "knee"),
        }
    }
}

/// Calibration of one servo channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointCalibration {
    pub channel: u8,
    pub offset: f64,
    pub invert: bool,
}

impl JointCalibration {
    pub const fn new(channel: u8, offset: f64, invert: bool) -> Self {
        Self {
            channel,
            offset,
            invert,
        }
    }

    /// Ideal joint angle to actuator angle, before clamping.
    pub fn to_actuator(&self, theta: f64) -> f64 {
        if self.invert {
            self.offset - theta
        } else {
            self.offset + theta
        }
    }

    /// Actuator angle back to the ideal joint angle.
    pub fn to_joint(&self, actuator: f64) -> f64 {
        if self.invert {
            self.offset - actuator
        } else {
            actuator - self.offset
        }
    }
}

/// Hip and knee calibration of one leg.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegCalibration {
    pub hip: JointCalibration,
    pub knee: JointCalibration,
}

impl LegCalibration {
    pub const fn new(hip: JointCalibration, knee: JointCalibration) -> Self {
        Self { hip, knee }
    }
}

/// Mechanical travel of the servos, in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ServoRange {
    min: f64,
    max: f64,
}

impl ServoRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ConfigError> {
        if !(min.is_finite() && max.is_finite()) || min >= max {
            return Err(ConfigError::InvalidRange {
                name: "servo travel",
                min,
                max,
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Clamp to the travel. Returns the clamped angle and whether it was changed.
    pub fn clamp(&self, angle: f64) -> (f64, bool) {
        let clamped = angle.clamp(self.min, self.max);
        (clamped, clamped != angle)
    }
}

/// Actuator command for both joints of a leg.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ServoCommand {
    pub hip_channel: u8,
    pub hip: f64,
    pub knee_channel: u8,
    pub knee: f64,
    /// Number of joints (0, 1 or 2) that had to be clamped.
    pub clamped: u8,
}

/// Calibration of every leg, one entry per [`Leg`].
#[derive(Clone, Debug, PartialEq)]
pub struct LegTable {
    legs: [LegCalibration; 4],
}

impl LegTable {
    /// Builds the table from one entry per leg.
    ///
    /// Fails when a leg is missing or listed twice, or when channels are out of
    /// range or shared.
    pub fn new(entries: &[(Leg, LegCalibration)]) -> Result<Self, ConfigError> {
        let mut slots: [Option<LegCalibration>; 4] = [None; 4];

        for (leg, calibration) in entries {
            let slot = &mut slots[leg.index()];
            if slot.is_some() {
                return Err(ConfigError::DuplicateLeg(*leg));
            }
            *slot = Some(*calibration);
        }

        let mut legs = Vec::with_capacity(4);
        for leg in Leg::ALL {
            match slots[leg.index()] {
                Some(calibration) => legs.push(calibration),
                None => return Err(ConfigError::MissingLeg(leg)),
            }
        }

        let legs: [LegCalibration; 4] = [legs[0], legs[1], legs[2], legs[3]];
        Self::validate(&legs)?;
        Ok(Self { legs })
    }

    fn validate(legs: &[LegCalibration; 4]) -> Result<(), ConfigError> {
        let mut owners: [Option<Leg>; CHANNEL_COUNT as usize] = [None; CHANNEL_COUNT as usize];

        for leg in Leg::ALL {
            let calibration = &legs[leg.index()];
            for joint in [calibration.hip, calibration.knee] {
                if !joint.offset.is_finite() {
                    return Err(ConfigError::NonFinite("calibration offset"));
                }
                if joint.channel >= CHANNEL_COUNT {
                    return Err(ConfigError::InvalidChannel {
                        leg,
                        channel: joint.channel,
                        limit: CHANNEL_COUNT,
                    });
                }
                let owner = &mut owners[joint.channel as usize];
                if let Some(first) = *owner {
                    return Err(ConfigError::DuplicateChannel {
                        channel: joint.channel,
                        first,
                        second: leg,
                    });
                }
                *owner = Some(leg);
            }
        }
        Ok(())
    }

    pub fn get(&self, leg: Leg) -> &LegCalibration {
        &self.legs[leg.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Leg, &LegCalibration)> {
        Leg::ALL.into_iter().map(move |leg| (leg, self.get(leg)))
    }

    /// Leg and joint driven by `channel`, if any.
    pub fn owner(&self, channel: u8) -> Option<(Leg, Joint, &JointCalibration)> {
        self.iter().find_map(|(leg, calibration)| {
            if calibration.hip.channel == channel {
                Some((leg, Joint::Hip, &calibration.hip))
            } else if calibration.knee.channel == channel {
                Some((leg, Joint::Knee, &calibration.knee))
            } else {
                None
            }
        })
    }

    /// Maps ideal joint angles of `leg` onto clamped actuator angles.
    pub fn command(&self, leg: Leg, angles: JointAngles, range: &ServoRange) -> ServoCommand {
        let calibration = self.get(leg);

        let hip_raw = calibration.hip.to_actuator(angles.hip);
        let knee_raw = calibration.knee.to_actuator(angles.knee);
        let (hip, hip_clamped) = range.clamp(hip_raw);
        let (knee, knee_clamped) = range.clamp(knee_raw);

        if hip_clamped {
            warn!(
                "{} hip command {:.1}° clamped to {:.1}° (channel {})",
                leg, hip_raw, hip, calibration.hip.channel
            );
        }
        if knee_clamped {
            warn!(
                "{} knee command {:.1}° clamped to {:.1}° (channel {})",
                leg, knee_raw, knee, calibration.knee.channel
            );
        }

        ServoCommand {
            hip_channel: calibration.hip.channel,
            hip,
            knee_channel: calibration.knee.channel,
            knee,
            clamped: hip_clamped as u8 + knee_clamped as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn range() -> ServoRange {
        ServoRange::new(0.0, 180.0).unwrap()
    }

    #[test]
    fn test_offset_and_invert() {
        let plain = JointCalibration::new(0, 90.0, false);
        let mirrored = JointCalibration::new(1, 90.0, true);

        assert_eq!(plain.to_actuator(30.0), 120.0);
        assert_eq!(mirrored.to_actuator(30.0), 60.0);
    }

    #[test]
    fn test_mapping_inverts() {
        for offset in [-90.0, 0.0, 45.5, 90.0, 180.0] {
            for invert in [false, true] {
                let joint = JointCalibration::new(3, offset, invert);
                for theta in [-170.0, -60.25, 0.0, 12.0, 135.0] {
                    let back = joint.to_joint(joint.to_actuator(theta));
                    assert!((back - theta).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_default_table_is_valid() -> Result<(), ConfigError> {
        let table = LegTable::new(&config::default_leg_calibration())?;
        assert_eq!(table.iter().count(), 4);
        assert_eq!(table.get(Leg::RearLeft).hip.channel, 4);
        Ok(())
    }

    #[test]
    fn test_channel_owner() -> Result<(), ConfigError> {
        let table = LegTable::new(&config::default_leg_calibration())?;

        let (leg, joint, calibration) = table.owner(3).unwrap();
        assert_eq!((leg, joint), (Leg::FrontRight, Joint::Knee));
        assert_eq!(joint.to_string(), "knee");

        // Mirrored right knee at offset 0: 70° on the servo is -70° at the joint
        assert_eq!(calibration.to_joint(70.0), -70.0);

        let (leg, joint, calibration) = table.owner(4).unwrap();
        assert_eq!((leg, joint), (Leg::RearLeft, Joint::Hip));
        assert_eq!(calibration.to_joint(120.0), -60.0);

        assert!(table.owner(12).is_none());
        Ok(())
    }

    #[test]
    fn test_missing_and_duplicate_legs_fail() {
        let mut entries = config::default_leg_calibration().to_vec();
        entries.pop();
        assert_eq!(
            LegTable::new(&entries),
            Err(ConfigError::MissingLeg(Leg::RearRight))
        );

        let mut entries = config::default_leg_calibration().to_vec();
        entries[3].0 = Leg::FrontLeft;
        assert_eq!(
            LegTable::new(&entries),
            Err(ConfigError::DuplicateLeg(Leg::FrontLeft))
        );
    }

    #[test]
    fn test_bad_channels_fail() {
        let mut entries = config::default_leg_calibration();
        entries[1].1.knee.channel = 16;
        assert!(matches!(
            LegTable::new(&entries),
            Err(ConfigError::InvalidChannel { channel: 16, .. })
        ));

        let mut entries = config::default_leg_calibration();
        entries[2].1.hip.channel = 0;
        assert_eq!(
            LegTable::new(&entries),
            Err(ConfigError::DuplicateChannel {
                channel: 0,
                first: Leg::FrontLeft,
                second: Leg::RearLeft,
            })
        );
    }

    #[test]
    fn test_command_clamps_to_travel() -> Result<(), ConfigError> {
        let table = LegTable::new(&config::default_leg_calibration())?;

        // Left legs are offset by 180, any positive hip angle runs past the end stop
        let command = table.command(Leg::FrontLeft, JointAngles::new(20.0, -30.0), &range());
        assert_eq!(command.hip, 180.0);
        assert_eq!(command.knee, 150.0);
        assert_eq!(command.clamped, 1);

        let command = table.command(Leg::FrontRight, JointAngles::new(-40.0, -70.0), &range());
        assert_eq!(command.hip, 40.0);
        assert_eq!(command.knee, 70.0);
        assert_eq!(command.clamped, 0);
        assert_eq!((command.hip_channel, command.knee_channel), (2, 3));
        Ok(())
    }

    #[test]
    fn test_invalid_range_rejected() {
        assert!(ServoRange::new(180.0, 0.0).is_err());
        assert!(ServoRange::new(0.0, f64::INFINITY).is_err());
        assert_eq!(range().clamp(-5.0), (0.0, true));
        assert_eq!(range().clamp(90.0), (90.0, false));
    }
}
