//! Foot trajectories for the swing and stance phases.

use std::time::Duration;

use nalgebra::Point2;

use crate::config::{
    LIFT_HEIGHT_MM, MAX_TRAJECTORY_SAMPLES, STEP_LENGTH_MM, STEP_PERIOD_SECS, TRAJECTORY_SAMPLES,
};
use crate::error::ConfigError;

/// Cubic Bezier curve through control points `p0..p3` at `t` in [0, 1].
pub fn bezier3(
    p0: Point2<f64>,
    p1: Point2<f64>,
    p2: Point2<f64>,
    p3: Point2<f64>,
    t: f64,
) -> Point2<f64> {
    let u = 1.0 - t;
    let coords = p0.coords * (u * u * u)
        + p1.coords * (3.0 * u * u * t)
        + p2.coords * (3.0 * u * t * t)
        + p3.coords * (t * t * t);
    Point2::from(coords)
}

/// Step shape and timing shared by the swing and stance primitives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaitParams {
    /// Forward travel of the foot per step (mm)
    pub step_length: f64,
    /// Height of the swing arc control points above the stand pose (mm)
    pub lift: f64,
    /// Time taken by one swing or stance primitive
    pub period: Duration,
    /// Number of intervals per primitive, at most [`MAX_TRAJECTORY_SAMPLES`].
    /// N + 1 points are commanded.
    pub samples: usize,
}

impl Default for GaitParams {
    fn default() -> Self {
        Self {
            step_length: STEP_LENGTH_MM,
            lift: LIFT_HEIGHT_MM,
            period: Duration::from_secs_f64(STEP_PERIOD_SECS),
            samples: TRAJECTORY_SAMPLES,
        }
    }
}

impl GaitParams {
    pub fn new(
        step_length: f64,
        lift: f64,
        period_secs: f64,
        samples: usize,
    ) -> Result<Self, ConfigError> {
        if !step_length.is_finite() {
            return Err(ConfigError::NonFinite("step length"));
        }
        if !lift.is_finite() {
            return Err(ConfigError::NonFinite("lift height"));
        }
        let period = Duration::try_from_secs_f64(period_secs)
            .map_err(|_| ConfigError::InvalidPeriod(period_secs))?;
        if !(1..=MAX_TRAJECTORY_SAMPLES).contains(&samples) {
            return Err(ConfigError::InvalidSamples {
                got: samples,
                max: MAX_TRAJECTORY_SAMPLES,
            });
        }
        Ok(Self {
            step_length,
            lift,
            period,
            samples,
        })
    }

    /// Pause between two consecutive samples of a primitive lasting `duration`.
    pub fn interval_for(&self, duration: Duration) -> Duration {
        let samples = self.samples.clamp(1, MAX_TRAJECTORY_SAMPLES) as u32;
        duration / samples
    }

    /// Pause between two consecutive samples at the configured period.
    pub fn sample_interval(&self) -> Duration {
        self.interval_for(self.period)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Foot lifted and carried forward along a Bezier arc.
    Swing,
    /// Foot planted and dragged back under the body.
    Stance,
}

/// Finite sequence of foot targets for one primitive.
///
/// Yields `samples + 1` points so both ends of the path are commanded.
#[derive(Clone, Debug)]
pub struct FootPath {
    phase: Phase,
    control: [Point2<f64>; 4],
    samples: usize,
    next: usize,
}

impl FootPath {
    /// Swing from `stand` to `stand + (dx, 0)`, control points raised by `lift`
    /// at a quarter and three quarters of the step.
    pub fn swing(stand: Point2<f64>, dx: f64, lift: f64, samples: usize) -> Self {
        let (x0, y0) = (stand.x, stand.y);
        Self {
            phase: Phase::Swing,
            control: [
                stand,
                Point2::new(x0 + dx * 0.25, y0 + lift),
                Point2::new(x0 + dx * 0.75, y0 + lift),
                Point2::new(x0 + dx, y0),
            ],
            samples: samples.max(1),
            next: 0,
        }
    }

    /// Straight line from `stand + (dx, 0)` back to `stand` at constant height.
    pub fn stance(stand: Point2<f64>, dx: f64, samples: usize) -> Self {
        let front = Point2::new(stand.x + dx, stand.y);
        Self {
            phase: Phase::Stance,
            control: [front, front, stand, stand],
            samples: samples.max(1),
            next: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Foot target at `t` in [0, 1].
    pub fn point_at(&self, t: f64) -> Point2<f64> {
        let [p0, p1, p2, p3] = self.control;
        match self.phase {
            Phase::Swing => bezier3(p0, p1, p2, p3, t),
            Phase::Stance => Point2::new(p0.x * (1.0 - t) + p3.x * t, p0.y),
        }
    }
}

impl Iterator for FootPath {
    type Item = Point2<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.samples {
            return None;
        }
        let t = self.next as f64 / self.samples as f64;
        self.next += 1;
        Some(self.point_at(t))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.samples + 1).saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FootPath {}
