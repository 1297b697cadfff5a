//! Error types for the `dronehouse-world` crate.

use dronehouse_types::{TileRect, WarehouseId};

/// Errors that can occur during host operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorldError {
    /// The building is not in the registry.
    #[error("building not found: {0}")]
    BuildingNotFound(WarehouseId),

    /// A new building would overlap an existing one.
    #[error("footprint {bounds:?} overlaps an existing building")]
    Overlap {
        /// The rejected footprint.
        bounds: TileRect,
    },

    /// A footprint reaches outside the farm.
    #[error("footprint {bounds:?} is outside the farm")]
    OutOfBounds {
        /// The rejected footprint.
        bounds: TileRect,
    },
}
