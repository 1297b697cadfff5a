//! Things an agent can claim.

use serde::{Deserialize, Serialize};

use dronehouse_types::{AnimalId, Tile};

/// A claimable work target.
///
/// Two agents never hold equal targets at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TargetRef {
    /// A harvestable crop, fruit tree or forage item.
    Crop(Tile),
    /// A dry tilled tile.
    DryTile(Tile),
    /// A farm animal.
    Animal(AnimalId),
    /// Debris inside a farmer zone.
    Debris(Tile),
}
