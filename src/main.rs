use std::time::Duration;

use clap::{Parser, Subcommand};
use nalgebra::Point2;

use quad_gait::actuator::PulseRange;
use quad_gait::calibration::{LegTable, ServoRange};
use quad_gait::config::{self, RobotConfig};
use quad_gait::pca9685::Pca9685;
use quad_gait::trajectory::GaitParams;
use quad_gait::{Elbow, Gait, Leg, LegGeometry, ServoLegs};

// Usage:
//  quad-gait stand                        all feet to the stand pose
//  quad-gait move --leg FL 20 -150        one foot to (x, y) in its hip frame
//  quad-gait step --leg RR                single swing of one leg
//  quad-gait trot --steps 2 --dx 50       diagonal trot, then stand
#[derive(Parser, Debug)]
#[command(name = "quad-gait", about = "Two-link quadruped leg control over a PCA9685")]
struct Cli {
    /// Femur length (mm)
    #[arg(long, default_value_t = config::FEMUR_LENGTH_MM)]
    femur: f64,

    /// Tibia length (mm)
    #[arg(long, default_value_t = config::TIBIA_LENGTH_MM)]
    tibia: f64,

    /// Stand pose x in the hip frame (mm)
    #[arg(long, default_value_t = config::STAND_X, allow_negative_numbers = true)]
    stand_x: f64,

    /// Stand pose y in the hip frame (mm), negative is below the hip
    #[arg(long, default_value_t = config::STAND_Y, allow_negative_numbers = true)]
    stand_y: f64,

    /// Use the knee-up inverse kinematics branch
    #[arg(long)]
    knee_up: bool,

    /// Duration of one swing or stance primitive (seconds)
    #[arg(long, default_value_t = config::STEP_PERIOD_SECS)]
    period: f64,

    /// Samples per swing or stance primitive
    #[arg(long, default_value_t = config::TRAJECTORY_SAMPLES)]
    samples: usize,

    /// Seconds to hold the final pose before the servos are released
    #[arg(long, default_value_t = 2.0)]
    hold: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Put every foot at the stand pose
    Stand,
    /// Put one foot at (x, y)
    Move {
        #[arg(long)]
        leg: Leg,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Swing one leg forward, then drag it back under the hip
    Step {
        #[arg(long)]
        leg: Leg,
        #[arg(long, default_value_t = config::STEP_LENGTH_MM, allow_negative_numbers = true)]
        dx: f64,
        #[arg(long, default_value_t = config::LIFT_HEIGHT_MM)]
        lift: f64,
    },
    /// Diagonal trot
    Trot {
        #[arg(long, default_value_t = 3)]
        steps: usize,
        #[arg(long, default_value_t = config::STEP_LENGTH_MM, allow_negative_numbers = true)]
        dx: f64,
        #[arg(long, default_value_t = config::LIFT_HEIGHT_MM)]
        lift: f64,
    },
}

fn build_config(cli: &Cli) -> Result<RobotConfig, Box<dyn std::error::Error>> {
    let elbow = if cli.knee_up {
        Elbow::KneeUp
    } else {
        Elbow::KneeDown
    };

    Ok(RobotConfig::new(
        LegGeometry::new(cli.femur, cli.tibia)?,
        LegTable::new(&config::default_leg_calibration())?,
        ServoRange::new(config::SERVO_MIN_ANGLE, config::SERVO_MAX_ANGLE)?,
        Point2::new(cli.stand_x, cli.stand_y),
        GaitParams::new(
            config::STEP_LENGTH_MM,
            config::LIFT_HEIGHT_MM,
            cli.period,
            cli.samples,
        )?,
        elbow,
    )?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    // Configuration faults stop us here, before anything moves
    let config = build_config(&cli)?;

    println!("Starting quadruped controller...");
    println!(
        "  Links: femur {:.1} mm, tibia {:.1} mm (reach {:.1}..{:.1} mm)",
        config.geometry.femur(),
        config.geometry.tibia(),
        config.geometry.min_reach(),
        config.geometry.max_reach()
    );
    println!("  Stand: ({:.1}, {:.1}) mm", config.stand.x, config.stand.y);

    let pca = Pca9685::new(
        config::PCA9685_BUS,
        config::PCA9685_ADDRESS,
        config::PWM_FREQUENCY_HZ,
    )?;
    println!("✓ PCA9685 initialized");

    let legs = ServoLegs::new(
        pca,
        config.legs.clone(),
        config.servo_range,
        PulseRange::new(config::SERVO_MIN_PULSE_US, config::SERVO_MAX_PULSE_US)?,
    );
    let mut gait = Gait::new(&config, legs);
    let period = config.gait.period;

    match cli.command {
        Command::Stand => gait.stand_all()?,
        Command::Move { leg, x, y } => {
            if gait.move_foot(leg, Point2::new(x, y))? {
                println!("  {} foot at ({:.1}, {:.1})", leg.name(), x, y);
            } else {
                println!("  ({:.1}, {:.1}) is out of reach for {}", x, y, leg.name());
            }
        }
        Command::Step { leg, dx, lift } => {
            gait.stand_all()?;
            gait.step(leg, dx, lift, period)?;
            gait.sweep(leg, dx, period)?;
        }
        Command::Trot { steps, dx, lift } => {
            gait.stand_all()?;
            gait.trot(steps, dx, lift, period)?;
            gait.stand_all()?;
        }
    }

    // Outputs are switched off when the driver is dropped
    if let Ok(hold) = Duration::try_from_secs_f64(cli.hold) {
        std::thread::sleep(hold);
    }

    println!(
        "Done. {} samples out of reach, {} servo commands clamped.",
        gait.skipped_samples(),
        gait.actuator().clamp_count()
    );
    Ok(())
}
