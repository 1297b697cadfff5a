//! The farm as the drone scheduler sees it.
//!
//! The scheduler never talks to the game directly. Everything it needs from
//! the host (building lookup, crop and animal queries, the effects of work,
//! per-building metadata) goes through the traits in [`host`]. This crate
//! also holds the caches the scheduler rebuilds from those queries and the
//! shared warehouse chest.
//!
//! # Modules
//!
//! - [`host`] -- [`BuildingRegistry`] and [`FarmWorld`] collaborator traits.
//! - [`cache`] -- [`DryList`] and [`NoFlyList`], rebuilt on demand.
//! - [`chest`] -- The bounded per-warehouse [`Chest`].
//! - [`sim_farm`] -- [`SimFarm`], an in-memory host for the simulator and tests.
//! - [`error`] -- Error types for host operations.

pub mod cache;
pub mod chest;
pub mod error;
pub mod host;
pub mod sim_farm;

pub use cache::{DryList, NoFlyList};
pub use chest::Chest;
pub use error::WorldError;
pub use host::{
    AnimalInfo, BuildingKind, BuildingRegistry, ClearOutcome, FarmHost, FarmWorld, Footprint,
    Harvestable,
};
pub use sim_farm::{SimFarm, SimFarmLayout};
