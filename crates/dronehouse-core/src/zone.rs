//! Zone geometry: the union of beacon squares.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use dronehouse_types::{Tile, TileRect};

/// A committed beacon: a square of `size` tiles centred on `center`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Beacon {
    /// Centre tile.
    pub center: Tile,
    /// Side length in tiles.
    pub size: u32,
}

impl Beacon {
    /// Create a beacon.
    pub const fn new(center: Tile, size: u32) -> Self {
        Self { center, size }
    }

    /// The square the beacon covers.
    pub fn square(&self) -> TileRect {
        TileRect::square_around(self.center, self.size)
    }
}

/// Every distinct tile covered by the beacons.
pub fn zone_tiles(beacons: &[Beacon]) -> BTreeSet<Tile> {
    beacons
        .iter()
        .flat_map(|b| b.square().tiles().collect::<Vec<_>>())
        .collect()
}

/// Number of distinct tiles covered by the beacons.
pub fn zone_tile_count(beacons: &[Beacon]) -> usize {
    zone_tiles(beacons).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_squares_are_counted_once() {
        let beacons = [
            Beacon::new(Tile::new(10, 10), 5),
            Beacon::new(Tile::new(12, 12), 5),
        ];
        assert_eq!(zone_tile_count(&beacons), 41);
    }

    #[test]
    fn disjoint_squares_add_up() {
        let beacons = [
            Beacon::new(Tile::new(0, 0), 3),
            Beacon::new(Tile::new(10, 0), 1),
        ];
        assert_eq!(zone_tile_count(&beacons), 10);
    }

    #[test]
    fn empty_zone() {
        assert!(zone_tiles(&[]).is_empty());
    }
}
