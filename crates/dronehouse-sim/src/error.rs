//! Error types for the simulation binary.

use dronehouse_core::clock::ClockError;
use dronehouse_core::config::ConfigError;
use dronehouse_core::persistence::PersistError;
use dronehouse_world::WorldError;

/// Errors that can stop a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The scheduler configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The `simulation` section could not be parsed.
    #[error("simulation settings error: {0}")]
    Settings(#[from] serde_yml::Error),

    /// Reading the config file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The clock rejected its settings or overflowed.
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),

    /// The simulated farm refused a building.
    #[error("farm error: {0}")]
    World(#[from] WorldError),

    /// Saving warehouse state failed.
    #[error("save error: {0}")]
    Persist(#[from] PersistError),
}
