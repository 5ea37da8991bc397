//! Leg commands and the trot scheduler.
//!
//! Execution is single threaded and paced by sleeping between samples. Legs
//! that move "together" are commanded one after another inside the same
//! sample tick, then the generator pauses for `duration / N`.

use std::thread;
use std::time::Duration;

use log::{debug, info};
use nalgebra::Point2;

use crate::actuator::LegActuator;
use crate::config::RobotConfig;
use crate::error::DriverError;
use crate::kinematics::{Elbow, LegGeometry};
use crate::leg::{DiagonalPair, Leg};
use crate::trajectory::{FootPath, GaitParams};

/// Waits between two trajectory samples.
pub trait Pacer {
    fn pause(&mut self, interval: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, interval: Duration) {
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }
}

pub struct Gait<A: LegActuator, P: Pacer = ThreadPacer> {
    actuator: A,
    pacer: P,
    geometry: LegGeometry,
    stand: Point2<f64>,
    elbow: Elbow,
    params: GaitParams,
    settle: Duration,
    feet: [Option<Point2<f64>>; 4],
    skipped: u64,
}

impl<A: LegActuator> Gait<A> {
    pub fn new(config: &RobotConfig, actuator: A) -> Self {
        Self::with_pacer(config, actuator, ThreadPacer)
    }
}

impl<A: LegActuator, P: Pacer> Gait<A, P> {
    pub fn with_pacer(config: &RobotConfig, actuator: A, pacer: P) -> Self {
        Self {
            actuator,
            pacer,
            geometry: config.geometry,
            stand: config.stand,
            elbow: config.elbow,
            params: config.gait,
            settle: config.settle,
            feet: [None; 4],
            skipped: 0,
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Last foot position commanded to `leg`, if any.
    pub fn foot(&self, leg: Leg) -> Option<Point2<f64>> {
        self.feet[leg.index()]
    }

    /// Number of samples dropped because their target was out of reach.
    pub fn skipped_samples(&self) -> u64 {
        self.skipped
    }

    /// Puts the foot of `leg` at `foot` in its hip frame.
    ///
    /// Returns `Ok(false)` without moving the leg when the target is out of
    /// reach; the leg keeps its last commanded position.
    pub fn move_foot(&mut self, leg: Leg, foot: Point2<f64>) -> Result<bool, DriverError> {
        let angles = match self.geometry.inverse(foot, self.elbow) {
            Ok(angles) => angles,
            Err(err) => {
                self.skipped += 1;
                debug!("{} skipped: {}", leg, err);
                return Ok(false);
            }
        };

        self.actuator.set_leg_angles(leg, angles)?;
        self.feet[leg.index()] = Some(foot);
        Ok(true)
    }

    /// Every leg to the stand pose, then waits for the servos to settle.
    pub fn stand_all(&mut self) -> Result<(), DriverError> {
        info!("Standing at ({:.1}, {:.1})", self.stand.x, self.stand.y);
        for leg in Leg::ALL {
            self.move_foot(leg, self.stand)?;
        }
        self.pacer.pause(self.settle);
        Ok(())
    }

    fn follow(&mut self, leg: Leg, path: FootPath, duration: Duration) -> Result<(), DriverError> {
        let interval = self.params.interval_for(duration);
        for foot in path {
            self.move_foot(leg, foot)?;
            self.pacer.pause(interval);
        }
        Ok(())
    }

    /// Swing: lifts `leg` and carries its foot `dx` forward along a Bezier arc.
    pub fn step(
        &mut self,
        leg: Leg,
        dx: f64,
        lift: f64,
        duration: Duration,
    ) -> Result<(), DriverError> {
        debug!("{} swing dx={:.1} lift={:.1}", leg, dx, lift);
        let path = FootPath::swing(self.stand, dx, lift, self.params.samples);
        self.follow(leg, path, duration)
    }

    /// Stance: drags the planted foot of `leg` from `dx` ahead back to the stand pose.
    pub fn sweep(&mut self, leg: Leg, dx: f64, duration: Duration) -> Result<(), DriverError> {
        debug!("{} stance dx={:.1}", leg, dx);
        let path = FootPath::stance(self.stand, dx, self.params.samples);
        self.follow(leg, path, duration)
    }

    /// One half of a trot cycle: `swing` pair in the air, the other pair planted.
    fn half_cycle(
        &mut self,
        swing: DiagonalPair,
        dx: f64,
        lift: f64,
        duration: Duration,
    ) -> Result<(), DriverError> {
        let interval = self.params.interval_for(duration);
        let arc = FootPath::swing(self.stand, dx, lift, self.params.samples);
        let drag = FootPath::stance(self.stand, dx, self.params.samples);

        for (up, down) in arc.zip(drag) {
            for leg in swing.legs() {
                self.move_foot(leg, up)?;
            }
            for leg in swing.other().legs() {
                self.move_foot(leg, down)?;
            }
            self.pacer.pause(interval);
        }
        Ok(())
    }

    /// Diagonal trot: each cycle swings FL+RR while FR+RL push back, then swaps.
    /// Only one diagonal pair is ever lifted.
    pub fn trot(
        &mut self,
        steps: usize,
        dx: f64,
        lift: f64,
        duration: Duration,
    ) -> Result<(), DriverError> {
        info!(
            "Trot: {} cycles, dx={:.1} lift={:.1} period={:?}",
            steps, dx, lift, duration
        );
        for cycle in 0..steps {
            for pair in [DiagonalPair::LeftFront, DiagonalPair::RightFront] {
                debug!("cycle {}: {} swing", cycle + 1, pair);
                self.half_cycle(pair, dx, lift, duration)?;
            }
        }
        if self.skipped > 0 {
            info!("{} unreachable samples skipped so far", self.skipped);
        }
        Ok(())
    }

    /// Trot with the configured step length, lift and period.
    pub fn trot_default(&mut self, steps: usize) -> Result<(), DriverError> {
        let GaitParams {
            step_length,
            lift,
            period,
            ..
        } = self.params;
        self.trot(steps, step_length, lift, period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::kinematics::JointAngles;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Event {
        Command(Leg, JointAngles),
        Pause(Duration),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct RecordingLegs(Log);

    impl LegActuator for RecordingLegs {
        fn set_leg_angles(&mut self, leg: Leg, angles: JointAngles) -> Result<(), DriverError> {
            self.0.borrow_mut().push(Event::Command(leg, angles));
            Ok(())
        }
    }

    struct RecordingPacer(Log);

    impl Pacer for RecordingPacer {
        fn pause(&mut self, interval: Duration) {
            self.0.borrow_mut().push(Event::Pause(interval));
        }
    }

    fn gait() -> (Gait<RecordingLegs, RecordingPacer>, Log, RobotConfig) {
        let config = RobotConfig::with_defaults().unwrap();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let gait = Gait::with_pacer(
            &config,
            RecordingLegs(Rc::clone(&log)),
            RecordingPacer(Rc::clone(&log)),
        );
        (gait, log, config)
    }

    /// Splits the log into ticks: the commands issued between two pauses.
    fn ticks(log: &Log) -> Vec<Vec<(Leg, JointAngles)>> {
        let mut ticks = vec![Vec::new()];
        for event in log.borrow().iter() {
            match event {
                Event::Command(leg, angles) => ticks.last_mut().unwrap().push((*leg, *angles)),
                Event::Pause(_) => ticks.push(Vec::new()),
            }
        }
        ticks.pop();
        ticks
    }

    #[test]
    fn test_move_foot_commands_leg() -> Result<(), DriverError> {
        let (mut gait, log, config) = gait();

        assert!(gait.move_foot(Leg::FrontLeft, Point2::new(20.0, -150.0))?);
        assert_eq!(gait.foot(Leg::FrontLeft), Some(Point2::new(20.0, -150.0)));

        match log.borrow()[0] {
            Event::Command(Leg::FrontLeft, angles) => {
                let foot = config.geometry.forward(angles);
                assert!((foot.x - 20.0).abs() < 1e-9 && (foot.y + 150.0).abs() < 1e-9);
                assert!(angles.knee < 0.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_unreachable_target_keeps_last_position() -> Result<(), DriverError> {
        let (mut gait, log, _) = gait();

        gait.move_foot(Leg::RearRight, Point2::new(0.0, -160.0))?;
        assert!(!gait.move_foot(Leg::RearRight, Point2::new(0.0, -250.0))?);

        assert_eq!(gait.foot(Leg::RearRight), Some(Point2::new(0.0, -160.0)));
        assert_eq!(gait.skipped_samples(), 1);
        assert_eq!(log.borrow().len(), 1);
        Ok(())
    }

    #[test]
    fn test_stand_all_moves_every_leg() -> Result<(), DriverError> {
        let (mut gait, log, config) = gait();
        gait.stand_all()?;

        for leg in Leg::ALL {
            assert_eq!(gait.foot(leg), Some(config.stand));
        }
        let events = log.borrow();
        assert_eq!(events.len(), 5);
        assert_eq!(*events.last().unwrap(), Event::Pause(config.settle));
        Ok(())
    }

    #[test]
    fn test_step_and_sweep_pacing() -> Result<(), DriverError> {
        let (mut gait, log, config) = gait();

        gait.step(Leg::FrontLeft, 60.0, 35.0, Duration::from_millis(400))?;
        assert_eq!(gait.foot(Leg::FrontLeft), Some(Point2::new(60.0, -160.0)));

        gait.sweep(Leg::FrontLeft, 60.0, Duration::from_millis(400))?;
        assert_eq!(gait.foot(Leg::FrontLeft), Some(config.stand));

        let samples = config.gait.samples;
        let events = log.borrow();
        assert_eq!(events.len(), 2 * 2 * (samples + 1));
        for event in events.iter() {
            if let Event::Pause(interval) = event {
                assert_eq!(*interval, Duration::from_millis(20));
            }
        }
        Ok(())
    }

    #[test]
    fn test_trot_lifts_one_pair_at_a_time() -> Result<(), DriverError> {
        let (mut gait, log, config) = gait();
        gait.trot(2, 60.0, 35.0, Duration::from_millis(350))?;

        let ticks = ticks(&log);
        assert_eq!(ticks.len(), 2 * 2 * (config.gait.samples + 1));

        let mut swung = [false; 4];
        for tick in &ticks {
            assert_eq!(tick.len(), 4, "every leg is commanded every tick");

            let lifted: Vec<Leg> = tick
                .iter()
                .filter(|(_, angles)| config.geometry.forward(*angles).y > config.stand.y + 1e-6)
                .map(|(leg, _)| *leg)
                .collect();

            if let Some(first) = lifted.first() {
                let pair = first.pair();
                assert!(
                    lifted.iter().all(|leg| leg.pair() == pair),
                    "both diagonal pairs lifted: {:?}",
                    lifted
                );
            }
            for leg in lifted {
                swung[leg.index()] = true;
            }
        }
        assert_eq!(swung, [true; 4]);
        assert_eq!(gait.skipped_samples(), 0);
        Ok(())
    }

    #[test]
    fn test_trot_order_starts_with_front_left_pair() -> Result<(), DriverError> {
        let (mut gait, log, config) = gait();
        gait.trot(1, 60.0, 35.0, Duration::ZERO)?;

        let ticks = ticks(&log);
        let half = config.gait.samples + 1;
        let legs: Vec<Leg> = ticks[1].iter().map(|(leg, _)| *leg).collect();
        assert_eq!(legs, [Leg::FrontLeft, Leg::RearRight, Leg::FrontRight, Leg::RearLeft]);
        let legs: Vec<Leg> = ticks[half + 1].iter().map(|(leg, _)| *leg).collect();
        assert_eq!(legs, [Leg::FrontRight, Leg::RearLeft, Leg::FrontLeft, Leg::RearRight]);

        // Swing legs end a step ahead, stance legs back under the hip
        for leg in Leg::ALL {
            let foot = gait.foot(leg).unwrap();
            let expected = if leg.pair() == DiagonalPair::RightFront {
                60.0
            } else {
                0.0
            };
            assert!((foot.x - expected).abs() < 1e-9, "{} at {}", leg, foot.x);
        }
        Ok(())
    }

    #[test]
    fn test_trot_default_uses_configured_period() -> Result<(), DriverError> {
        let (mut gait, log, config) = gait();
        gait.trot_default(1)?;

        let interval = config.gait.sample_interval();
        let pauses: Vec<Duration> = log
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Pause(d) => Some(*d),
                Event::Command(..) => None,
            })
            .collect();
        assert_eq!(pauses.len(), 2 * (config.gait.samples + 1));
        assert!(pauses.iter().all(|d| *d == interval));
        Ok(())
    }

    #[test]
    fn test_pacing_with_many_samples() -> Result<(), DriverError> {
        let mut config = RobotConfig::with_defaults().unwrap();
        config.gait = GaitParams::new(60.0, 35.0, 1.0, config::MAX_TRAJECTORY_SAMPLES).unwrap();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut gait = Gait::with_pacer(
            &config,
            RecordingLegs(Rc::clone(&log)),
            RecordingPacer(Rc::clone(&log)),
        );

        gait.sweep(Leg::RearLeft, 60.0, Duration::from_secs(2))?;

        let events = log.borrow();
        assert_eq!(events.len(), 2 * (config::MAX_TRAJECTORY_SAMPLES + 1));
        assert_eq!(events[1], Event::Pause(Duration::from_micros(200)));
        Ok(())
    }

    #[test]
    fn test_trot_survives_unreachable_samples() -> Result<(), DriverError> {
        let (mut gait, log, config) = gait();

        // (150, -160) is 219 mm from the hip, beyond the 200 mm reach
        gait.trot(1, 150.0, 35.0, Duration::ZERO)?;

        assert!(gait.skipped_samples() > 0);
        assert_eq!(ticks(&log).len(), 2 * (config.gait.samples + 1));
        for leg in Leg::ALL {
            let foot = gait.foot(leg).unwrap();
            assert!(config.geometry.is_reachable(foot));
        }
        Ok(())
    }
}
