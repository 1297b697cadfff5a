//! Target selection.
//!
//! Every finder returns the nearest eligible candidate, or `None` when there
//! is nothing to do (an idle agent stays idle; that is not an error).
//! Drones rank candidates by distance to the warehouse hatch, which sits at
//! the centre of the building, and only see targets they can reach in a
//! straight line without crossing another building. Farmers rank zone tiles by distance to their own position.
//!
//! Ties break on the target itself so selection is deterministic.

use std::collections::BTreeSet;

use dronehouse_agents::TargetRef;
use dronehouse_ledger::DailyReservations;
use dronehouse_types::{HarvestKind, Position, Tile, WarehouseId};
use dronehouse_world::{DryList, FarmWorld, NoFlyList};

use crate::claims::ClaimSet;
use crate::config::HarvesterConfig;

/// Everything a finder needs to know about the searching warehouse.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    /// Searching warehouse.
    pub home: WarehouseId,
    /// Warehouse hatch: candidates are ranked by distance to it and must be
    /// in line of sight from it.
    pub origin: Position,
    /// Buildings drones must avoid.
    pub no_fly: &'a NoFlyList,
    /// Line-of-sight padding in tiles.
    pub los_pad: f64,
    /// Targets already taken.
    pub claims: &'a ClaimSet,
}

impl SearchContext<'_> {
    fn reachable(&self, world: &dyn FarmWorld, tile: Tile) -> bool {
        world.in_bounds(tile) && self.no_fly.allows(self.home, self.origin, tile, self.los_pad)
    }

    fn free(&self, target: &TargetRef) -> bool {
        !self.claims.is_claimed(target)
    }
}

fn nearest(
    from: Position,
    candidates: impl Iterator<Item = (TargetRef, Tile)>,
) -> Option<(TargetRef, Tile)> {
    candidates.min_by(|(ta, a), (tb, b)| {
        from.distance(a.center())
            .total_cmp(&from.distance(b.center()))
            .then_with(|| ta.cmp(tb))
    })
}

/// Whether a harvester is configured to pick this kind.
pub const fn harvests(kind: HarvestKind, config: &HarvesterConfig) -> bool {
    match kind {
        HarvestKind::FlowerCrop => !config.skip_flower_crops,
        HarvestKind::FruitTree => !config.skip_fruit_trees,
        HarvestKind::Crop | HarvestKind::Forage => true,
    }
}

/// Nearest ripe crop the harvester may pick.
pub fn find_harvest(
    ctx: &SearchContext<'_>,
    world: &dyn FarmWorld,
    config: &HarvesterConfig,
) -> Option<(TargetRef, Tile)> {
    let candidates = world
        .harvestables()
        .into_iter()
        .filter(|h| harvests(h.kind, config))
        .map(|h| (TargetRef::Crop(h.tile), h.tile))
        .filter(|(target, tile)| ctx.free(target) && ctx.reachable(world, *tile));
    nearest(ctx.origin, candidates)
}

/// Nearest tile on the dry list that is still dry.
pub fn find_dry_tile(
    ctx: &SearchContext<'_>,
    world: &dyn FarmWorld,
    dry: &DryList,
) -> Option<(TargetRef, Tile)> {
    let candidates = dry
        .iter()
        .map(|tile| (TargetRef::DryTile(tile), tile))
        .filter(|(target, tile)| {
            ctx.free(target) && ctx.reachable(world, *tile) && world.is_dry(*tile)
        });
    nearest(ctx.origin, candidates)
}

/// Nearest animal not groomed or reserved today.
pub fn find_animal(
    ctx: &SearchContext<'_>,
    world: &dyn FarmWorld,
    reservations: &DailyReservations,
) -> Option<(TargetRef, Tile)> {
    let candidates = world
        .animals()
        .into_iter()
        .filter(|a| !a.petted_today && !reservations.is_reserved(a.id))
        .map(|a| (TargetRef::Animal(a.id), a.tile))
        .filter(|(target, tile)| ctx.free(target) && ctx.reachable(world, *tile));
    nearest(ctx.origin, candidates)
}

/// Nearest zone tile a farmer at `from` should clear next.
///
/// Farmers walk, so only the tile itself has to be outside foreign
/// buildings; no line-of-sight check applies.
pub fn find_debris(
    home: WarehouseId,
    from: Position,
    remaining: &BTreeSet<Tile>,
    world: &dyn FarmWorld,
    no_fly: &NoFlyList,
    claims: &ClaimSet,
) -> Option<(TargetRef, Tile)> {
    let candidates = remaining
        .iter()
        .map(|tile| (TargetRef::Debris(*tile), *tile))
        .filter(|(target, tile)| {
            !claims.is_claimed(target)
                && world.in_bounds(*tile)
                && world.clearable_at(*tile)
                && !no_fly.blocks_tile(home, *tile)
        });
    nearest(from, candidates)
}

/// Whether a committed target can still be worked.
pub fn is_still_valid(target: TargetRef, world: &dyn FarmWorld) -> bool {
    match target {
        TargetRef::Crop(tile) => world.in_bounds(tile) && world.harvestable_at(tile).is_some(),
        TargetRef::DryTile(tile) => world.in_bounds(tile) && world.is_dry(tile),
        TargetRef::Animal(id) => world.is_groomable(id),
        TargetRef::Debris(tile) => world.in_bounds(tile) && world.clearable_at(tile),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dronehouse_types::TileRect;
    use dronehouse_world::SimFarm;

    struct Fixture {
        farm: SimFarm,
        home: WarehouseId,
        no_fly: NoFlyList,
        claims: ClaimSet,
    }

    impl Fixture {
        fn new() -> Self {
            let mut farm = SimFarm::new(40, 40, 9);
            let home = farm.add_warehouse(TileRect::new(0, 0, 3, 2)).unwrap();
            Self {
                farm,
                home,
                no_fly: NoFlyList::new(),
                claims: ClaimSet::new(),
            }
        }

        fn rebuild(&mut self) {
            self.no_fly.rebuild(&self.farm, 1);
        }

        fn ctx(&self) -> SearchContext<'_> {
            SearchContext {
                home: self.home,
                origin: TileRect::new(0, 0, 3, 2).center(),
                no_fly: &self.no_fly,
                los_pad: 0.125,
                claims: &self.claims,
            }
        }
    }

    #[test]
    fn nearest_crop_wins() {
        let mut fx = Fixture::new();
        fx.farm.plant(Tile::new(9, 9), HarvestKind::Crop, "(O)24", false);
        fx.farm.plant(Tile::new(4, 3), HarvestKind::Crop, "(O)24", false);
        fx.rebuild();
        let found = find_harvest(&fx.ctx(), &fx.farm, &HarvesterConfig::default());
        assert_eq!(found, Some((TargetRef::Crop(Tile::new(4, 3)), Tile::new(4, 3))));
    }

    #[test]
    fn claimed_and_skipped_crops_are_excluded() {
        let mut fx = Fixture::new();
        fx.farm.plant(Tile::new(4, 3), HarvestKind::Crop, "(O)24", false);
        fx.farm.plant(Tile::new(5, 3), HarvestKind::FlowerCrop, "(O)591", false);
        fx.farm.plant(Tile::new(9, 9), HarvestKind::Crop, "(O)24", false);
        fx.rebuild();
        assert!(fx.claims.try_claim(TargetRef::Crop(Tile::new(4, 3))));
        let found = find_harvest(&fx.ctx(), &fx.farm, &HarvesterConfig::default());
        assert_eq!(found.map(|(_, t)| t), Some(Tile::new(9, 9)));
    }

    #[test]
    fn targets_behind_buildings_are_out_of_sight() {
        let mut fx = Fixture::new();
        fx.farm.add_building(TileRect::new(0, 6, 4, 2)).unwrap();
        fx.farm.till(Tile::new(1, 12), false);
        fx.rebuild();
        let mut dry = DryList::new();
        dry.rebuild(&fx.farm);
        assert!(find_dry_tile(&fx.ctx(), &fx.farm, &dry).is_none());
    }

    #[test]
    fn reserved_and_petted_animals_are_skipped() {
        let mut fx = Fixture::new();
        let near = fx.farm.add_animal(Tile::new(4, 4));
        let far = fx.farm.add_animal(Tile::new(8, 8));
        let petted = fx.farm.add_animal(Tile::new(3, 3));
        fx.farm.groom(petted);
        fx.rebuild();
        let mut reservations = DailyReservations::new();
        reservations.reserve(near);
        let found = find_animal(&fx.ctx(), &fx.farm, &reservations);
        assert_eq!(found.map(|(t, _)| t), Some(TargetRef::Animal(far)));
    }

    #[test]
    fn farmers_pick_the_tile_nearest_to_them() {
        let mut fx = Fixture::new();
        for x in [10, 14, 20] {
            fx.farm.add_debris(Tile::new(x, 10), false);
        }
        fx.rebuild();
        let remaining: BTreeSet<Tile> = [10, 14, 20].map(|x| Tile::new(x, 10)).into();
        let found = find_debris(
            fx.home,
            Tile::new(19, 10).center(),
            &remaining,
            &fx.farm,
            &fx.no_fly,
            &fx.claims,
        );
        assert_eq!(found.map(|(_, t)| t), Some(Tile::new(20, 10)));
    }

    #[test]
    fn validity_follows_the_world() {
        let mut fx = Fixture::new();
        fx.farm.plant(Tile::new(4, 3), HarvestKind::Crop, "(O)24", false);
        let crop = TargetRef::Crop(Tile::new(4, 3));
        assert!(is_still_valid(crop, &fx.farm));
        fx.farm.remove_crop(Tile::new(4, 3));
        assert!(!is_still_valid(crop, &fx.farm));
        assert!(!is_still_valid(TargetRef::Debris(Tile::new(-1, 0)), &fx.farm));
    }
}
