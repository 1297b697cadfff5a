//! Tile-grid geometry shared by every crate.
//!
//! Tiles are integer grid cells. Agents move in continuous tile space
//! ([`Position`]), where the centre of tile `(x, y)` sits at
//! `(x + 0.5, y + 0.5)`.

use serde::{Deserialize, Serialize};

/// A single grid cell on the farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tile {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Tile {
    /// Create a tile from grid coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Centre of this tile in continuous tile space.
    pub fn center(self) -> Position {
        Position::new(f64::from(self.x) + 0.5, f64::from(self.y) + 0.5)
    }

    /// Squared Euclidean distance between tile centres, in tiles.
    pub fn distance_sq(self, other: Self) -> i64 {
        let dx = i64::from(self.x).saturating_sub(i64::from(other.x));
        let dy = i64::from(self.y).saturating_sub(i64::from(other.y));
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Chebyshev (king-move) distance, used for beacon radius checks.
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A point in continuous tile space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate, in tiles.
    pub x: f64,
    /// Vertical coordinate, in tiles.
    pub y: f64,
}

impl Position {
    /// Create a position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Move up to `step` tiles in a straight line towards `target`.
    ///
    /// Returns the new position, snapped onto `target` when the remaining
    /// distance is within `step`.
    pub fn move_toward(self, target: Self, step: f64) -> Self {
        let dist = self.distance(target);
        if dist <= step || dist <= f64::EPSILON {
            return target;
        }
        let ratio = step / dist;
        Self::new(
            (target.x - self.x).mul_add(ratio, self.x),
            (target.y - self.y).mul_add(ratio, self.y),
        )
    }

    /// The tile containing this position.
    #[allow(clippy::cast_possible_truncation)]
    pub fn tile(self) -> Tile {
        // Saturating float-to-int conversion; farm coordinates are small.
        Tile::new(self.x.floor() as i32, self.y.floor() as i32)
    }
}

/// An axis-aligned rectangle of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRect {
    /// Left column.
    pub x: i32,
    /// Top row.
    pub y: i32,
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
}

impl TileRect {
    /// Create a rectangle.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The `size`×`size` square centred on `center`.
    ///
    /// Even sizes extend one tile further towards the bottom-right.
    pub fn square_around(center: Tile, size: u32) -> Self {
        let half = i32::try_from(size / 2).unwrap_or(i32::MAX);
        Self::new(
            center.x.saturating_sub(half),
            center.y.saturating_sub(half),
            size,
            size,
        )
    }

    /// Exclusive right column.
    pub fn right(&self) -> i32 {
        self.x
            .saturating_add(i32::try_from(self.width).unwrap_or(i32::MAX))
    }

    /// Exclusive bottom row.
    pub fn bottom(&self) -> i32 {
        self.y
            .saturating_add(i32::try_from(self.height).unwrap_or(i32::MAX))
    }

    /// Number of tiles covered.
    pub fn area(&self) -> u64 {
        u64::from(self.width).saturating_mul(u64::from(self.height))
    }

    /// Whether `tile` lies inside the rectangle.
    pub fn contains(&self, tile: Tile) -> bool {
        tile.x >= self.x && tile.x < self.right() && tile.y >= self.y && tile.y < self.bottom()
    }

    /// Whether two rectangles share at least one tile.
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Geometric centre in continuous tile space.
    pub fn center(&self) -> Position {
        Position::new(
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }

    /// Grow the rectangle by `pad` tiles on every side.
    pub fn inflate(&self, pad: u32) -> Self {
        let shift = i32::try_from(pad).unwrap_or(i32::MAX);
        let grow = pad.saturating_mul(2);
        Self::new(
            self.x.saturating_sub(shift),
            self.y.saturating_sub(shift),
            self.width.saturating_add(grow),
            self.height.saturating_add(grow),
        )
    }

    /// Every tile of the rectangle, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        let (left, right) = (self.x, self.right());
        (self.y..self.bottom()).flat_map(move |y| (left..right).map(move |x| Tile::new(x, y)))
    }
}

/// Whether the segment `a`→`b` touches `rect` once the rectangle is grown by
/// `pad` tiles (fractional) on every side.
///
/// Endpoints inside the rectangle count as an intersection.
pub fn segment_intersects_rect(rect: &TileRect, pad: f64, a: Position, b: Position) -> bool {
    let min_x = f64::from(rect.x) - pad;
    let min_y = f64::from(rect.y) - pad;
    let max_x = f64::from(rect.right()) + pad;
    let max_y = f64::from(rect.bottom()) + pad;

    // Liang-Barsky clipping of the parametric segment against the slab pair.
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in [
        (-dx, a.x - min_x),
        (dx, max_x - a.x),
        (-dy, a.y - min_y),
        (dy, max_y - a.y),
    ] {
        if p.abs() <= f64::EPSILON {
            if q < 0.0 {
                return false;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_around_is_centred() {
        let rect = TileRect::square_around(Tile::new(10, 10), 5);
        assert_eq!(rect, TileRect::new(8, 8, 5, 5));
        assert_eq!(rect.area(), 25);
        assert!(rect.contains(Tile::new(12, 12)));
        assert!(!rect.contains(Tile::new(13, 12)));
    }

    #[test]
    fn tiles_enumerates_area() {
        let rect = TileRect::new(-1, 2, 3, 2);
        let tiles: Vec<Tile> = rect.tiles().collect();
        assert_eq!(tiles.len(), 6);
        assert_eq!(tiles.first(), Some(&Tile::new(-1, 2)));
        assert_eq!(tiles.last(), Some(&Tile::new(1, 3)));
    }

    #[test]
    fn inflate_grows_every_side() {
        let rect = TileRect::new(4, 4, 2, 3).inflate(1);
        assert_eq!(rect, TileRect::new(3, 3, 4, 5));
    }

    #[test]
    fn move_toward_snaps_on_arrival() {
        let from = Position::new(0.0, 0.0);
        let to = Position::new(3.0, 4.0);
        let mid = from.move_toward(to, 2.5);
        assert!((mid.distance(to) - 2.5).abs() < 1e-9);
        assert_eq!(mid.move_toward(to, 10.0), to);
    }

    #[test]
    fn segment_crossing_rect_is_detected() {
        let rect = TileRect::new(5, 0, 2, 10);
        let a = Position::new(0.5, 5.5);
        let b = Position::new(10.5, 5.5);
        assert!(segment_intersects_rect(&rect, 0.0, a, b));
    }

    #[test]
    fn segment_beside_rect_is_clear_until_padded() {
        let rect = TileRect::new(5, 0, 2, 2);
        let a = Position::new(0.5, 2.25);
        let b = Position::new(10.5, 2.25);
        assert!(!segment_intersects_rect(&rect, 0.0, a, b));
        assert!(segment_intersects_rect(&rect, 0.5, a, b));
    }

    #[test]
    fn endpoint_inside_rect_counts() {
        let rect = TileRect::new(0, 0, 3, 3);
        let inside = Position::new(1.5, 1.5);
        let outside = Position::new(8.0, 8.0);
        assert!(segment_intersects_rect(&rect, 0.0, inside, outside));
    }

    #[test]
    fn chebyshev_distance() {
        assert_eq!(Tile::new(0, 0).chebyshev(Tile::new(3, -7)), 7);
    }
}
