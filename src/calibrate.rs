use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};

use quad_gait::actuator::PulseRange;
use quad_gait::config::{self, RobotConfig};
use quad_gait::pca9685::Pca9685;
use quad_gait::{JointAngles, Leg, LegActuator, ServoLegs};

/// Servo calibration helper. Tune the offsets and invert flags in
/// `config.rs` with this before running any gait.
#[derive(Parser, Debug)]
#[command(name = "calibrate")]
struct Cli {
    /// Seconds to hold the servos before releasing them
    #[arg(long, default_value_t = 10)]
    hold: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the leg table and the servo angles of the stand pose
    Show,
    /// Drive every joint to its zero angle: legs stretched straight along +x
    Neutral,
    /// Drive one raw channel to an actuator angle
    Servo {
        #[arg(long)]
        channel: u8,
        #[arg(long)]
        angle: f64,
    },
    /// Drive one leg's joints to ideal angles through the table
    Leg {
        #[arg(long)]
        leg: Leg,
        #[arg(long, allow_negative_numbers = true)]
        hip: f64,
        #[arg(long, allow_negative_numbers = true)]
        knee: f64,
    },
}

fn show(config: &RobotConfig) -> Result<(), Box<dyn std::error::Error>> {
    let stand = config.geometry.inverse(config.stand, config.elbow)?;
    println!(
        "Stand pose ({:.1}, {:.1}) mm -> {}\n",
        config.stand.x, config.stand.y, stand
    );

    println!(
        "{:^6} | {:^24} | {:^24} | {:^20}",
        "Leg", "Hip (ch, offset, inv)", "Knee (ch, offset, inv)", "Stand servo angles"
    );
    println!("{:-<6}-+-{:-<24}-+-{:-<24}-+-{:-<20}", "", "", "", "");

    for (leg, calibration) in config.legs.iter() {
        let command = config.legs.command(leg, stand, &config.servo_range);
        println!(
            "{:^6} | {:>4} {:>9.1} {:>9} | {:>4} {:>9.1} {:>9} | {:>7.1}° {:>7.1}°{}",
            leg.abbreviation(),
            calibration.hip.channel,
            calibration.hip.offset,
            calibration.hip.invert,
            calibration.knee.channel,
            calibration.knee.offset,
            calibration.knee.invert,
            command.hip,
            command.knee,
            if command.clamped > 0 { "  CLAMPED" } else { "" }
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let config = RobotConfig::with_defaults()?;

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║     Leg Servo Calibration Tool                       ║");
    println!("╚══════════════════════════════════════════════════════╝\n");

    if let Command::Show = cli.command {
        return show(&config);
    }

    let pca = Pca9685::new(
        config::PCA9685_BUS,
        config::PCA9685_ADDRESS,
        config::PWM_FREQUENCY_HZ,
    )?;
    let mut legs = ServoLegs::new(
        pca,
        config.legs.clone(),
        config.servo_range,
        PulseRange::new(config::SERVO_MIN_PULSE_US, config::SERVO_MAX_PULSE_US)?,
    );

    match cli.command {
        Command::Show => {}
        Command::Neutral => {
            println!("Instructions:");
            println!("1. Every thigh and shin should point straight forward, level");
            println!("2. Adjust the offsets until they do\n");
            for (leg, calibration) in config.legs.iter() {
                legs.set_servo_angle(calibration.hip.channel, calibration.hip.offset)?;
                legs.set_servo_angle(calibration.knee.channel, calibration.knee.offset)?;
                println!(
                    "  {}: hip ch{} at {:.1}°, knee ch{} at {:.1}°",
                    leg,
                    calibration.hip.channel,
                    calibration.hip.offset,
                    calibration.knee.channel,
                    calibration.knee.offset
                );
            }
        }
        Command::Servo { channel, angle } => {
            let applied = legs.set_servo_angle(channel, angle)?;
            match config.legs.owner(channel) {
                Some((leg, joint, calibration)) => println!(
                    "  Channel {} at {:.1}° ({} {} joint angle {:.1}°)",
                    channel,
                    applied,
                    leg.name(),
                    joint,
                    calibration.to_joint(applied)
                ),
                None => println!("  Channel {} at {:.1}° (not in the leg table)", channel, applied),
            }
        }
        Command::Leg { leg, hip, knee } => {
            let angles = JointAngles::new(hip, knee);
            legs.set_leg_angles(leg, angles)?;
            let foot = config.geometry.forward(angles);
            println!(
                "  {} at {} (foot ({:.1}, {:.1}) mm)",
                leg.name(),
                angles,
                foot.x,
                foot.y
            );
        }
    }

    if legs.clamp_count() > 0 {
        println!(
            "  Warning: {} command(s) clamped to the servo travel",
            legs.clamp_count()
        );
    }

    println!("\nHolding for {} seconds...", cli.hold);
    thread::sleep(Duration::from_secs(cli.hold));
    legs.relax()?;
    Ok(())
}
