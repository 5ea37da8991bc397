pub mod actuator;
pub mod calibration;
pub mod config;
pub mod error;
pub mod gait;
pub mod kinematics;
pub mod leg;
pub mod pca9685;
pub mod trajectory;

// Re-export commonly used types
pub use actuator::{LegActuator, ServoLegs};
pub use config::RobotConfig;
pub use gait::Gait;
pub use kinematics::{Elbow, JointAngles, LegGeometry};
pub use leg::Leg;

#[cfg(test)]
pub(crate) mod mocks;
