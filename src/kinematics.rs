use std::fmt;

use nalgebra::Point2;

use crate::error::KinematicsError;

/// Rounding slack on the knee cosine. Targets exactly on the reach boundary
/// can land a few ulps outside [-1, 1].
const REACH_TOLERANCE: f64 = 1e-12;

/// Joint angles of one leg, in degrees.
///
/// `hip` is measured from the +x axis of the hip frame. `knee` is relative to
/// the thigh: 0 means the leg is fully stretched, +/-180 fully folded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointAngles {
    pub hip: f64,
    pub knee: f64,
}

impl JointAngles {
    pub fn new(hip: f64, knee: f64) -> Self {
        Self { hip, knee }
    }
}

impl fmt::Display for JointAngles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hip {:.1}°, knee {:.1}°", self.hip, self.knee)
    }
}

/// Which of the two inverse kinematics branches to return.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Elbow {
    /// Negative knee angle. The usual quadruped stance.
    #[default]
    KneeDown,
    /// Positive knee angle.
    KneeUp,
}

/// Planar two-link leg: femur `l1` from hip to knee, tibia `l2` from knee to foot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegGeometry {
    l1: f64,
    l2: f64,
}

impl LegGeometry {
    pub fn new(l1: f64, l2: f64) -> Result<Self, KinematicsError> {
        if !(l1.is_finite() && l1 > 0.0) {
            return Err(KinematicsError::InvalidLink {
                name: "femur",
                length: l1,
            });
        }
        if !(l2.is_finite() && l2 > 0.0) {
            return Err(KinematicsError::InvalidLink {
                name: "tibia",
                length: l2,
            });
        }
        Ok(Self { l1, l2 })
    }

    pub fn femur(&self) -> f64 {
        self.l1
    }

    pub fn tibia(&self) -> f64 {
        self.l2
    }

    /// Smallest hip to foot distance the leg can reach.
    pub fn min_reach(&self) -> f64 {
        (self.l1 - self.l2).abs()
    }

    /// Largest hip to foot distance the leg can reach.
    pub fn max_reach(&self) -> f64 {
        self.l1 + self.l2
    }

    /// Cosine of the knee angle needed to put the foot at (x, y), snapped to
    /// [-1, 1] within [`REACH_TOLERANCE`]. `None` when the target cannot be reached.
    fn knee_cosine(&self, x: f64, y: f64) -> Option<f64> {
        let d = (x * x + y * y - self.l1 * self.l1 - self.l2 * self.l2) / (2.0 * self.l1 * self.l2);
        if d.is_finite() && d.abs() <= 1.0 + REACH_TOLERANCE {
            Some(d.clamp(-1.0, 1.0))
        } else {
            None
        }
    }

    pub fn is_reachable(&self, foot: Point2<f64>) -> bool {
        self.knee_cosine(foot.x, foot.y).is_some()
    }

    /// Forward kinematics: foot position for the given joint angles.
    pub fn forward(&self, angles: JointAngles) -> Point2<f64> {
        self.forward_joints(angles).1
    }

    /// Forward kinematics returning both the knee and the foot positions.
    pub fn forward_joints(&self, angles: JointAngles) -> (Point2<f64>, Point2<f64>) {
        let t1 = angles.hip.to_radians();
        let t12 = t1 + angles.knee.to_radians();

        let knee = Point2::new(self.l1 * t1.cos(), self.l1 * t1.sin());
        let foot = Point2::new(knee.x + self.l2 * t12.cos(), knee.y + self.l2 * t12.sin());
        (knee, foot)
    }

    /// Inverse kinematics: joint angles that put the foot at `foot`.
    ///
    /// Returns [`KinematicsError::Unreachable`] instead of a NaN result when the
    /// target lies outside the reachable annulus. On the annulus boundary the
    /// two branches coincide and `elbow` has no effect.
    pub fn inverse(&self, foot: Point2<f64>, elbow: Elbow) -> Result<JointAngles, KinematicsError> {
        let (x, y) = (foot.x, foot.y);
        let d = self
            .knee_cosine(x, y)
            .ok_or_else(|| KinematicsError::Unreachable {
                x,
                y,
                distance: x.hypot(y),
                min: self.min_reach(),
                max: self.max_reach(),
            })?;

        let s2 = (1.0 - d * d).max(0.0).sqrt();
        let theta2 = match elbow {
            // s2 == 0 is the stretched or folded leg, both branches give the same knee
            _ if s2 == 0.0 => s2.atan2(d),
            Elbow::KneeDown => -s2.atan2(d),
            Elbow::KneeUp => s2.atan2(d),
        };

        let k1 = self.l1 + self.l2 * theta2.cos();
        let k2 = self.l2 * theta2.sin();
        let theta1 = (y * k1 - x * k2).atan2(x * k1 + y * k2);

        Ok(JointAngles::new(theta1.to_degrees(), theta2.to_degrees()))
    }
}
