//! Drone scheduling, zone selection, farmer jobs and persistence for
//! Dronehouse.
//!
//! This crate owns the per-tick orchestration that turns warehouses on the
//! farm into working drone fleets: target acquisition, agent stepping,
//! charge accounting, the zone-selection session and farmer job queues.
//!
//! # Modules
//!
//! - [`claims`] -- Per-tick set of targets taken by some agent.
//! - [`clock`] -- In-game clock with ten-minute steps and day rollover.
//! - [`command`] -- [`CommandOutcome`] returned by every input command.
//! - [`config`] -- Configuration loading from `dronehouse-config.yaml` into
//!   strongly-typed structs.
//! - [`jobs`] -- [`FarmerJob`] and the per-warehouse [`FarmerQueue`].
//! - [`persistence`] -- Warehouse records in host building metadata.
//! - [`scheduler`] -- The [`DroneScheduler`] tick loop and command surface.
//! - [`selection`] -- Beacon placement session.
//! - [`targeting`] -- Nearest-target finders per role.
//! - [`warehouse`] -- [`Warehouse`] state and its [`Roster`].
//! - [`zone`] -- Beacon squares and zone tile sets.
//!
//! [`CommandOutcome`]: command::CommandOutcome
//! [`FarmerJob`]: jobs::FarmerJob
//! [`FarmerQueue`]: jobs::FarmerQueue
//! [`DroneScheduler`]: scheduler::DroneScheduler
//! [`Warehouse`]: warehouse::Warehouse
//! [`Roster`]: warehouse::Roster

pub mod claims;
pub mod clock;
pub mod command;
pub mod config;
pub mod jobs;
pub mod persistence;
pub mod scheduler;
pub mod selection;
pub mod targeting;
pub mod warehouse;
pub mod zone;

pub use clock::{ClockEvent, GameClock, GameTime};
pub use command::CommandOutcome;
pub use config::DroneConfig;
pub use scheduler::{DroneScheduler, TickSummary};
pub use warehouse::{Roster, Warehouse};
