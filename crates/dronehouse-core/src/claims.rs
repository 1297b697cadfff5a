//! The per-tick claim set.
//!
//! At the start of every tick the set is cleared and re-seeded with the
//! targets agents already hold. During the tick a target can be claimed
//! once; the second claimant is refused. This is the only mutual exclusion
//! the scheduler needs: all agents are stepped on one thread.

use std::collections::BTreeSet;

use dronehouse_agents::TargetRef;

/// Targets taken this tick.
#[derive(Debug, Clone, Default)]
pub struct ClaimSet {
    claimed: BTreeSet<TargetRef>,
}

impl ClaimSet {
    /// An empty set.
    pub const fn new() -> Self {
        Self {
            claimed: BTreeSet::new(),
        }
    }

    /// Clear the set and re-seed it with targets already held.
    pub fn begin_tick(&mut self, held: impl IntoIterator<Item = TargetRef>) {
        self.claimed.clear();
        self.claimed.extend(held);
    }

    /// Claim a target. Returns `false` if someone already holds it.
    pub fn try_claim(&mut self, target: TargetRef) -> bool {
        self.claimed.insert(target)
    }

    /// Whether a target is taken.
    pub fn is_claimed(&self, target: &TargetRef) -> bool {
        self.claimed.contains(target)
    }

    /// Give a target back.
    pub fn release(&mut self, target: &TargetRef) {
        self.claimed.remove(target);
    }

    /// Number of claimed targets.
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    /// Whether nothing is claimed.
    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dronehouse_types::Tile;

    #[test]
    fn second_claim_is_refused() {
        let mut claims = ClaimSet::new();
        let target = TargetRef::Crop(Tile::new(1, 1));
        assert!(claims.try_claim(target));
        assert!(!claims.try_claim(target));
        claims.release(&target);
        assert!(claims.try_claim(target));
    }

    #[test]
    fn begin_tick_reseeds_held_targets() {
        let mut claims = ClaimSet::new();
        claims.try_claim(TargetRef::DryTile(Tile::new(0, 0)));
        claims.begin_tick([TargetRef::Debris(Tile::new(2, 2))]);
        assert_eq!(claims.len(), 1);
        assert!(claims.is_claimed(&TargetRef::Debris(Tile::new(2, 2))));
        assert!(!claims.is_claimed(&TargetRef::DryTile(Tile::new(0, 0))));
    }

    #[test]
    fn same_tile_different_kinds_do_not_conflict() {
        let mut claims = ClaimSet::new();
        let tile = Tile::new(4, 4);
        assert!(claims.try_claim(TargetRef::Crop(tile)));
        assert!(claims.try_claim(TargetRef::DryTile(tile)));
    }
}
