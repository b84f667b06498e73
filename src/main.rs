//! FurrowNav - Navigation core for a row-crop ground robot
//!
//! Runs the navigation core against the built-in field simulation. The real
//! robot gateway plugs in through the same [`furrow_nav::RobotLink`] seam.

use clap::Parser;
use furrow_nav::{FurrowConfig, Maneuver, Navigator, SimulatedField};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "furrow-nav", about = "Row-crop navigation core (simulated run)")]
struct Args {
    /// Path to a TOML configuration file (defaults to furrow.toml if present)
    config: Option<PathBuf>,

    /// Number of simulation ticks to run
    #[arg(long, default_value_t = 2000)]
    ticks: u32,

    /// Simulated tick period in milliseconds
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,

    /// Override the clustering epsilon, in millimeters
    #[arg(long)]
    epsilon: Option<f64>,
}

fn main() -> furrow_nav::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("furrow_nav=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            FurrowConfig::load(path)?
        }
        None => {
            if Path::new("furrow.toml").exists() {
                info!("Loading configuration from furrow.toml");
                FurrowConfig::load(Path::new("furrow.toml"))?
            } else {
                info!("Using default configuration");
                FurrowConfig::default()
            }
        }
    };

    info!("FurrowNav v{}", env!("CARGO_PKG_VERSION"));

    let mut navigator = Navigator::new(&config);
    if let Some(epsilon) = args.epsilon {
        info!("Epsilon override: {} mm", epsilon);
        navigator.scanner_mut().set_epsilon(epsilon);
    }

    let mut field = SimulatedField::new();
    let dt = Duration::from_millis(args.tick_ms);
    let mut turns_completed = 0u32;
    let mut previous = navigator.maneuver();

    for tick in 0..args.ticks {
        field.advance(dt);
        navigator.step(&mut field, dt);

        let current = navigator.maneuver();
        if previous == Maneuver::Turn && current != Maneuver::Turn {
            turns_completed += 1;
        }
        previous = current;

        if tick % 200 == 0 {
            info!(
                "tick {:5}: {} | {} sub-lines | {} expansion iterations | scan {:?} | run {:.1}",
                tick,
                current.as_str(),
                navigator.scanner().sub_lines().len(),
                navigator.scanner().iterations(),
                navigator.scan_time(),
                navigator.run_distance(),
            );
        }
    }

    info!(
        "Finished after {} ticks: state {}, {} headland turns, {} gyro resets, run distance {:.1}, position {:.0} mm",
        args.ticks,
        navigator.maneuver().as_str(),
        turns_completed,
        field.gyro_resets(),
        navigator.run_distance(),
        field.position_mm(),
    );

    Ok(())
}
