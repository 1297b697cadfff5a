//! Caches rebuilt from host queries.
//!
//! Both lists are fully rebuilt on demand and read-only in between. The
//! dry list is rebuilt on the configured in-game cadence, the no-fly list
//! whenever the set of buildings changes and after day start.

use std::collections::BTreeSet;

use tracing::debug;

use dronehouse_types::{Position, Tile, TileRect, WarehouseId, segment_intersects_rect};

use crate::host::{BuildingKind, BuildingRegistry, FarmWorld};

// ---------------------------------------------------------------------------
// Dry list
// ---------------------------------------------------------------------------

/// Tilled tiles that still need water.
#[derive(Debug, Clone, Default)]
pub struct DryList {
    tiles: BTreeSet<Tile>,
}

impl DryList {
    /// An empty list.
    pub const fn new() -> Self {
        Self {
            tiles: BTreeSet::new(),
        }
    }

    /// Replace the list with the host's current dry tiles.
    pub fn rebuild(&mut self, world: &dyn FarmWorld) {
        self.tiles = world.dry_tiles().into_iter().collect();
        debug!(count = self.tiles.len(), "dry list rebuilt");
    }

    /// Whether `tile` was dry at the last rebuild and not watered since.
    pub fn contains(&self, tile: Tile) -> bool {
        self.tiles.contains(&tile)
    }

    /// Forget a tile once it has been watered.
    pub fn mark_watered(&mut self, tile: Tile) {
        self.tiles.remove(&tile);
    }

    /// Dry tiles in grid order.
    pub fn iter(&self) -> impl Iterator<Item = Tile> + '_ {
        self.tiles.iter().copied()
    }

    /// Number of dry tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether nothing needs water.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

// ---------------------------------------------------------------------------
// No-fly list
// ---------------------------------------------------------------------------

/// Padded building footprints drones must neither target nor fly through.
///
/// A warehouse's own footprint never blocks its drones.
#[derive(Debug, Clone, Default)]
pub struct NoFlyList {
    zones: Vec<(Option<WarehouseId>, TileRect)>,
}

impl NoFlyList {
    /// An empty list.
    pub const fn new() -> Self {
        Self { zones: Vec::new() }
    }

    /// Rebuild from every building footprint, padded by `pad_tiles`.
    pub fn rebuild(&mut self, registry: &dyn BuildingRegistry, pad_tiles: u32) {
        self.zones = registry
            .find_buildings(BuildingKind::Any)
            .into_iter()
            .map(|fp| (fp.warehouse, fp.bounds.inflate(pad_tiles)))
            .collect();
        debug!(count = self.zones.len(), pad_tiles, "no-fly list rebuilt");
    }

    fn foreign(&self, home: WarehouseId) -> impl Iterator<Item = &TileRect> + '_ {
        self.zones
            .iter()
            .filter(move |(owner, _)| *owner != Some(home))
            .map(|(_, rect)| rect)
    }

    /// Whether `tile` lies inside a zone foreign to `home`.
    pub fn blocks_tile(&self, home: WarehouseId, tile: Tile) -> bool {
        self.foreign(home).any(|rect| rect.contains(tile))
    }

    /// Whether the straight flight `from`→`to` crosses a zone foreign to
    /// `home`, with zones grown by `pad` tiles.
    pub fn blocks_line(&self, home: WarehouseId, from: Position, to: Position, pad: f64) -> bool {
        self.foreign(home)
            .any(|rect| segment_intersects_rect(rect, pad, from, to))
    }

    /// Whether a drone from `home` flying out of `origin` may work `target`.
    pub fn allows(&self, home: WarehouseId, origin: Position, target: Tile, pad: f64) -> bool {
        !self.blocks_tile(home, target) && !self.blocks_line(home, origin, target.center(), pad)
    }

    /// Number of zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Whether there are no zones.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
