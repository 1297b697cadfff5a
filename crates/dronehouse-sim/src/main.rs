//! Headless simulation entry point for Dronehouse.
//!
//! Runs the drone scheduler against an in-memory farm for a number of
//! in-game days. Every day ends with a save into building metadata and a
//! fresh scheduler rebuilt from it, so persistence is exercised as hard as
//! the tick loop.
//!
//! ```text
//! dronehouse-sim [path/to/dronehouse-config.yaml]
//! ```
//!
//! `RUST_LOG` overrides the configured log level.

mod error;
mod settings;
mod sim;

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use dronehouse_core::DroneConfig;

use crate::error::SimError;
use crate::settings::SimSettings;
use crate::sim::Simulation;

/// Config file used when no path is given.
const DEFAULT_CONFIG: &str = "dronehouse-config.yaml";

/// Application entry point.
///
/// Loads configuration, initializes logging, builds the farm and runs the
/// configured number of days.
fn main() -> Result<(), SimError> {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let config = DroneConfig::from_file(&path)?;
    let settings = SimSettings::from_file(&path)?;

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        config = %path.display(),
        seed = settings.seed,
        width = settings.width,
        height = settings.height,
        "dronehouse-sim starting"
    );

    let mut simulation = Simulation::new(config, settings)?;
    simulation.run()?;
    Ok(())
}
