//! Wardpost CLI
//!
//! Offline tooling: emit or check a configuration, or replay a raw sample
//! sequence through the detection engine and watch the verdicts it makes.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use wardpost::config::AppConfig;
use wardpost_detect::{
    Direction, DirectionTriggerMode, MotionSensor, RangingSensor, SensorConfig, SensorKind,
};
use wardpost_hal::{RawReading, ScriptedRanging};

#[derive(Parser)]
#[command(name = "wardpost-cli", version, about = "Wardpost offline tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an example configuration file
    ExampleConfig,

    /// Write the example configuration to a file
    InitConfig {
        /// Destination path; an existing file is never overwritten
        #[arg(long, default_value = "config.toml")]
        path: PathBuf,
    },

    /// Load a configuration, apply corrections, print the effective result
    CheckConfig {
        /// Path to check; the standard search paths when omitted
        path: Option<PathBuf>,
    },

    /// Replay raw millimeter samples through the detection engine
    Simulate {
        /// Comma-separated millimeter values; use "x" for a timeout
        samples: String,

        /// Sample interval in milliseconds
        #[arg(long, default_value_t = 75)]
        interval_ms: u64,

        /// Direction sensitivity in millimeters (0 = adaptive)
        #[arg(long, default_value_t = 0)]
        sensitivity: u32,

        /// Smoothing window size (0 = kind default)
        #[arg(long, default_value_t = 3)]
        window: usize,

        /// Detection range lower bound, millimeters
        #[arg(long, default_value_t = 200)]
        min_range: u32,

        /// Detection range upper bound, millimeters
        #[arg(long, default_value_t = 3000)]
        max_range: u32,

        /// Which confirmed directions count as a match
        #[arg(long, value_enum, default_value = "both")]
        trigger_mode: TriggerModeArg,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum TriggerModeArg {
    Approaching,
    Receding,
    Both,
}

impl From<TriggerModeArg> for DirectionTriggerMode {
    fn from(arg: TriggerModeArg) -> Self {
        match arg {
            TriggerModeArg::Approaching => DirectionTriggerMode::ApproachingOnly,
            TriggerModeArg::Receding => DirectionTriggerMode::RecedingOnly,
            TriggerModeArg::Both => DirectionTriggerMode::Both,
        }
    }
}

/// One simulated tick, printed as a JSON line
#[derive(Serialize)]
struct TickRecord {
    tick: usize,
    raw: Option<u32>,
    distance_mm: Option<u32>,
    movement: bool,
    direction: Direction,
    detected: bool,
    matched: bool,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::ExampleConfig => {
            print!("{}", toml::to_string_pretty(&AppConfig::example())?);
            Ok(())
        }
        Commands::InitConfig { path } => {
            if path.exists() {
                bail!("{} already exists, refusing to overwrite", path.display());
            }
            AppConfig::example().save(&path)?;
            println!("wrote {}", path.display());
            Ok(())
        }
        Commands::CheckConfig { path } => {
            let config = match path {
                Some(p) => AppConfig::load_from(&p)?,
                None => AppConfig::load()?,
            };
            if !config.config_path.as_os_str().is_empty() {
                println!("# loaded from {}", config.config_path.display());
            }
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Simulate {
            samples,
            interval_ms,
            sensitivity,
            window,
            min_range,
            max_range,
            trigger_mode,
        } => {
            let readings = parse_samples(&samples)?;
            let config = SensorConfig {
                min_range_mm: min_range,
                max_range_mm: max_range,
                sensitivity_mm: sensitivity,
                window_size: window,
                sample_interval_ms: interval_ms,
                trigger_mode: trigger_mode.into(),
                ..SensorConfig::for_kind(SensorKind::Ultrasonic)
            };
            simulate(config, readings)
        }
    }
}

/// Correction warnings from config normalization land on stderr
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_samples(input: &str) -> Result<Vec<RawReading>> {
    let mut readings = Vec::new();
    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token.eq_ignore_ascii_case("x") {
            readings.push(RawReading::Timeout);
        } else {
            let mm: u32 = token
                .parse()
                .with_context(|| format!("bad sample value: {}", token))?;
            readings.push(RawReading::Millimeters(mm));
        }
    }
    if readings.is_empty() {
        bail!("no samples given");
    }
    Ok(readings)
}

fn simulate(config: SensorConfig, readings: Vec<RawReading>) -> Result<()> {
    let trigger_mode = config.trigger_mode;
    let interval = Duration::from_millis(config.sample_interval_ms.max(1));
    let count = readings.len();
    let raws: Vec<Option<u32>> = readings.iter().map(|r| r.millimeters()).collect();

    let transport = Box::new(ScriptedRanging::new(readings, config.max_range_mm));
    let mut sensor = RangingSensor::new(config, transport);
    sensor.begin()?;

    let base = Instant::now();
    for tick in 0..count {
        sensor.update(base + interval * tick as u32);

        let record = TickRecord {
            tick,
            raw: raws[tick],
            distance_mm: sensor.distance_mm(),
            movement: sensor.movement_detected(),
            direction: sensor.direction(),
            detected: sensor.motion_detected(),
            matched: sensor.motion_detected() && trigger_mode.matches(sensor.direction()),
        };
        println!("{}", serde_json::to_string(&record)?);
    }

    Ok(())
}
