//! Shared type definitions for the Dronehouse drone scheduler.
//!
//! This crate is the single source of truth for the identifiers, enums,
//! tile geometry and item types used across the workspace. Nothing here
//! owns behaviour beyond small, pure helpers on the types themselves.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifiers for warehouses, agents, jobs and animals
//! - [`enums`] -- Roles, resource kinds, agent/job phases, user message keys
//! - [`geometry`] -- Tiles, tile rectangles, continuous positions, line of sight
//! - [`items`] -- Item stacks carried by drones and stored in chests

pub mod enums;
pub mod geometry;
pub mod ids;
pub mod items;

// Re-export all public types at crate root for convenience.
pub use enums::{AgentPhase, HarvestKind, JobPhase, MessageKey, ResourceKind, Role, WorkPhase};
pub use geometry::{Position, Tile, TileRect, segment_intersects_rect};
pub use ids::{AgentId, AnimalId, JobId, WarehouseId};
pub use items::{ItemStack, total_quantity};
