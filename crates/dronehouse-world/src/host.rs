//! Collaborator interfaces implemented by the host game.
//!
//! The scheduler reads the world through these traits every scan pass and
//! applies the effects of finished work through them. Queries take typed
//! filters; nothing is looked up by type-name strings.
//!
//! Implementations must be cheap to query: the scheduler does not cache
//! results beyond one scan, except for the [`DryList`](crate::DryList) and
//! [`NoFlyList`](crate::NoFlyList).

use std::collections::BTreeMap;

use dronehouse_types::{AnimalId, HarvestKind, ItemStack, Tile, TileRect, WarehouseId};

use crate::WorldError;

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// Which buildings a registry query should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildingKind {
    /// Drone warehouses.
    Warehouse,
    /// Every other building (barns, silos, houses).
    Other,
    /// All buildings.
    Any,
}

/// A building's footprint on the farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    /// Set for warehouses, `None` for every other building.
    pub warehouse: Option<WarehouseId>,
    /// Tiles covered by the building.
    pub bounds: TileRect,
}

/// Something a harvester can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Harvestable {
    /// Where it stands.
    pub tile: Tile,
    /// What it is.
    pub kind: HarvestKind,
}

/// A farm animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimalInfo {
    /// Stable identity.
    pub id: AnimalId,
    /// Current tile.
    pub tile: Tile,
    /// Whether the host already counts it as petted today.
    pub petted_today: bool,
}

/// Result of a clearing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The debris was destroyed.
    Cleared,
    /// The debris resisted; it stays where it is.
    Failed,
    /// Nothing clearable was there any more.
    Gone,
}

// ---------------------------------------------------------------------------
// Building registry
// ---------------------------------------------------------------------------

/// Building lookup and per-building metadata storage.
pub trait BuildingRegistry {
    /// Footprints of every building of the given kind.
    fn find_buildings(&self, kind: BuildingKind) -> Vec<Footprint>;

    /// Tiles covered by a warehouse, if it still exists.
    fn building_bounds(&self, id: WarehouseId) -> Option<TileRect>;

    /// The building covering `tile`, if any.
    fn building_at(&self, tile: Tile) -> Option<Footprint>;

    /// Store a metadata value on a warehouse.
    fn write_metadata(&mut self, id: WarehouseId, key: &str, value: String)
    -> Result<(), WorldError>;

    /// All metadata stored on a warehouse.
    fn metadata(&self, id: WarehouseId) -> BTreeMap<String, String>;
}

// ---------------------------------------------------------------------------
// Farm world
// ---------------------------------------------------------------------------

/// Crop, tile and animal queries plus the effects of finished work.
pub trait FarmWorld {
    /// Whether the tile lies on the farm.
    fn in_bounds(&self, tile: Tile) -> bool;

    /// Everything currently ready to harvest.
    fn harvestables(&self) -> Vec<Harvestable>;

    /// What is ready to harvest at `tile`, if anything.
    fn harvestable_at(&self, tile: Tile) -> Option<HarvestKind>;

    /// Every tilled tile that still needs water today.
    fn dry_tiles(&self) -> Vec<Tile>;

    /// Whether `tile` still needs water.
    fn is_dry(&self, tile: Tile) -> bool;

    /// Every animal on the farm.
    fn animals(&self) -> Vec<AnimalInfo>;

    /// Whether the animal exists and can still be groomed today.
    fn is_groomable(&self, id: AnimalId) -> bool;

    /// Where the animal currently is.
    fn animal_tile(&self, id: AnimalId) -> Option<Tile>;

    /// Whether `tile` holds debris a farmer can clear.
    fn clearable_at(&self, tile: Tile) -> bool;

    /// Harvest at `tile`. `None` when nothing was there.
    fn harvest(&mut self, tile: Tile) -> Option<Vec<ItemStack>>;

    /// Water `tile`. Returns whether it was dry.
    fn water(&mut self, tile: Tile) -> bool;

    /// Groom an animal. Returns whether it could be groomed.
    fn groom(&mut self, id: AnimalId) -> bool;

    /// Try to clear debris at `tile`.
    fn clear(&mut self, tile: Tile) -> ClearOutcome;

    /// Drop items on the ground at `tile`.
    fn drop_items(&mut self, tile: Tile, items: Vec<ItemStack>);
}

/// The full host surface the scheduler is driven against.
pub trait FarmHost: BuildingRegistry + FarmWorld {}

impl<T: BuildingRegistry + FarmWorld + ?Sized> FarmHost for T {}
