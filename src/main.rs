//! Rotating vector visualizer.
//!
//! Draws a vector rotating about its origin together with its sine and cosine
//! projections. The angle comes from a stepper-motor controller on a serial port, or
//! from the built-in simulator when no port is given or the port cannot be opened.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use rotating_vector::channel::{MotorChannel, SerialChannel, SimulatedChannel};
use rotating_vector::config::{AppConfig, RenderSettings, SerialConfig, TimingConfig};

#[derive(Parser, Debug)]
#[command(name = "rotating-vector")]
#[command(about = "Rotating vector with sine and cosine projections")]
struct Args {
    /// Serial port of the motor controller (e.g., /dev/ttyACM0). Omit to use the simulator.
    #[arg(long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(long, default_value = "115200")]
    baud: u32,

    /// Directory holding image assets
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// TrueType font for captions. A system font is searched for if omitted.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Window width in logical pixels
    #[arg(long, default_value = "1600")]
    width: u32,

    /// Window height in logical pixels
    #[arg(long, default_value = "900")]
    height: u32,

    /// Simulator tick in milliseconds
    #[arg(long, default_value = "20")]
    sim_tick_ms: u64,

    /// Render tick in milliseconds
    #[arg(long, default_value = "20")]
    render_tick_ms: u64,

    /// Degrees added to hardware angle readings
    #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
    angle_offset: f64,

    /// Degrees added to the 180° goto target on hardware, typically -2.5 to -3.5
    #[arg(long = "cal-at-180", default_value = "0.0", allow_negative_numbers = true)]
    cal_at_180: f64,

    /// Start the vector at the slowest speed one second after launch
    #[arg(long)]
    autostart: bool,
}

fn open_channel(serial: Option<&SerialConfig>) -> Box<dyn MotorChannel> {
    let Some(serial) = serial else {
        info!("No serial port given, using the simulator");
        return Box::new(SimulatedChannel::new());
    };
    match SerialChannel::open(serial) {
        Ok(channel) => Box::new(channel),
        Err(err) => {
            warn!("Could not open {}: {err}. Falling back to the simulator", serial.port);
            Box::new(SimulatedChannel::new())
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let serial = args.port.map(|port| SerialConfig {
        port,
        baud_rate: args.baud,
        ..SerialConfig::default()
    });
    let timing = TimingConfig {
        simulator_tick: Duration::from_millis(args.sim_tick_ms.max(1)),
        render_tick: Duration::from_millis(args.render_tick_ms.max(1)),
        ..TimingConfig::default()
    };
    let config = AppConfig {
        window_width: args.width,
        window_height: args.height,
        settings: RenderSettings::builder()
            .angle_advance_offset(args.angle_offset)
            .build(),
        timing,
        serial,
        font_path: args.font,
        asset_dir: args.assets,
        autostart: args.autostart,
        calibration_offset_at_180: args.cal_at_180,
        ..AppConfig::default()
    };

    let channel = open_channel(config.serial.as_ref());
    rotating_vector::run(config, channel).context("Visualizer window failed")?;
    Ok(())
}
