//! An in-memory farm implementing the host traits.
//!
//! Used by the simulator binary and by tests. Layout generation is seeded
//! so the same seed always produces the same farm.
//!
//! # Day cycle
//!
//! [`SimFarm::start_day`] dries every tilled tile, ripens crops that were
//! set to regrow and clears the petted flag on every animal.

use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::debug;

use dronehouse_types::{AnimalId, HarvestKind, ItemStack, Tile, TileRect, WarehouseId};

use crate::WorldError;
use crate::host::{
    AnimalInfo, BuildingKind, BuildingRegistry, ClearOutcome, FarmWorld, Footprint, Harvestable,
};

/// Days a harvested regrowing crop needs before it is ripe again.
const REGROW_DAYS: u32 = 2;

/// How many random objects [`SimFarm::generate`] scatters.
#[derive(Debug, Clone, Deserialize)]
pub struct SimFarmLayout {
    /// Ripe crops.
    #[serde(default = "default_crops")]
    pub crops: u32,
    /// Tilled tiles (planted or not), all dry at start.
    #[serde(default = "default_tilled")]
    pub tilled: u32,
    /// Farm animals.
    #[serde(default = "default_animals")]
    pub animals: u32,
    /// Debris pieces; one in four is too tough to clear.
    #[serde(default = "default_debris")]
    pub debris: u32,
}

const fn default_crops() -> u32 {
    40
}

const fn default_tilled() -> u32 {
    60
}

const fn default_animals() -> u32 {
    6
}

const fn default_debris() -> u32 {
    30
}

impl Default for SimFarmLayout {
    fn default() -> Self {
        Self {
            crops: default_crops(),
            tilled: default_tilled(),
            animals: default_animals(),
            debris: default_debris(),
        }
    }
}

#[derive(Debug, Clone)]
struct SimCrop {
    kind: HarvestKind,
    item_id: String,
    ripe: bool,
    regrow_in: Option<u32>,
}

#[derive(Debug, Clone)]
struct SimBuilding {
    kind: BuildingKind,
    bounds: TileRect,
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy)]
struct SimAnimal {
    tile: Tile,
    petted: bool,
}

/// The in-memory farm.
#[derive(Debug, Clone)]
pub struct SimFarm {
    width: u32,
    height: u32,
    buildings: BTreeMap<WarehouseId, SimBuilding>,
    crops: BTreeMap<Tile, SimCrop>,
    watered: BTreeMap<Tile, bool>,
    animals: BTreeMap<AnimalId, SimAnimal>,
    debris: BTreeMap<Tile, bool>,
    dropped: Vec<(Tile, ItemStack)>,
    next_animal: u64,
    rng: SmallRng,
}

impl SimFarm {
    /// An empty farm of `width`×`height` tiles.
    pub fn new(width: u32, height: u32, seed: u64) -> Self {
        Self {
            width,
            height,
            buildings: BTreeMap::new(),
            crops: BTreeMap::new(),
            watered: BTreeMap::new(),
            animals: BTreeMap::new(),
            debris: BTreeMap::new(),
            dropped: Vec::new(),
            next_animal: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Scatter crops, tilled soil, animals and debris at random free tiles.
    pub fn generate(&mut self, layout: &SimFarmLayout) {
        for _ in 0..layout.tilled {
            if let Some(tile) = self.random_free_tile() {
                self.till(tile, false);
            }
        }
        for n in 0..layout.crops {
            if let Some(tile) = self.random_free_tile() {
                let kind = match n % 8 {
                    0 => HarvestKind::FlowerCrop,
                    1 => HarvestKind::FruitTree,
                    2 => HarvestKind::Forage,
                    _ => HarvestKind::Crop,
                };
                let item = match kind {
                    HarvestKind::Crop => "(O)24",
                    HarvestKind::FlowerCrop => "(O)591",
                    HarvestKind::FruitTree => "(O)613",
                    HarvestKind::Forage => "(O)16",
                };
                self.plant(tile, kind, item, n % 3 == 0);
            }
        }
        for _ in 0..layout.animals {
            if let Some(tile) = self.random_free_tile() {
                self.add_animal(tile);
            }
        }
        for n in 0..layout.debris {
            if let Some(tile) = self.random_free_tile() {
                self.add_debris(tile, n % 4 == 0);
            }
        }
        debug!(
            crops = self.crops.len(),
            tilled = self.watered.len(),
            animals = self.animals.len(),
            debris = self.debris.len(),
            "sim farm generated"
        );
    }

    fn random_free_tile(&mut self) -> Option<Tile> {
        let max_x = i32::try_from(self.width).ok()?;
        let max_y = i32::try_from(self.height).ok()?;
        if max_x == 0 || max_y == 0 {
            return None;
        }
        for _ in 0..32 {
            let tile = Tile::new(self.rng.random_range(0..max_x), self.rng.random_range(0..max_y));
            if self.is_free(tile) {
                return Some(tile);
            }
        }
        None
    }

    fn is_free(&self, tile: Tile) -> bool {
        self.building_at(tile).is_none()
            && !self.crops.contains_key(&tile)
            && !self.debris.contains_key(&tile)
            && !self.animals.values().any(|a| a.tile == tile)
    }

    fn fits(&self, bounds: TileRect) -> Result<(), WorldError> {
        let inside = bounds.x >= 0
            && bounds.y >= 0
            && i64::from(bounds.right()) <= i64::from(self.width)
            && i64::from(bounds.bottom()) <= i64::from(self.height);
        if !inside {
            return Err(WorldError::OutOfBounds { bounds });
        }
        if self.buildings.values().any(|b| b.bounds.intersects(&bounds)) {
            return Err(WorldError::Overlap { bounds });
        }
        Ok(())
    }

    /// Construct a warehouse.
    pub fn add_warehouse(&mut self, bounds: TileRect) -> Result<WarehouseId, WorldError> {
        self.add(BuildingKind::Warehouse, bounds)
    }

    /// Construct a non-warehouse building.
    pub fn add_building(&mut self, bounds: TileRect) -> Result<WarehouseId, WorldError> {
        self.add(BuildingKind::Other, bounds)
    }

    fn add(&mut self, kind: BuildingKind, bounds: TileRect) -> Result<WarehouseId, WorldError> {
        self.fits(bounds)?;
        let id = WarehouseId::new();
        self.buildings.insert(
            id,
            SimBuilding {
                kind,
                bounds,
                metadata: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    /// Demolish a building, discarding its metadata.
    pub fn remove_building(&mut self, id: WarehouseId) -> Result<(), WorldError> {
        self.buildings
            .remove(&id)
            .map(|_| ())
            .ok_or(WorldError::BuildingNotFound(id))
    }

    /// Put a ripe crop on `tile`. Regrowing crops ripen again after harvest.
    pub fn plant(&mut self, tile: Tile, kind: HarvestKind, item_id: &str, regrows: bool) {
        self.crops.insert(
            tile,
            SimCrop {
                kind,
                item_id: item_id.to_owned(),
                ripe: true,
                regrow_in: regrows.then_some(0),
            },
        );
    }

    /// Till a tile, optionally already watered.
    pub fn till(&mut self, tile: Tile, watered: bool) {
        self.watered.insert(tile, watered);
    }

    /// Add an animal at `tile`.
    pub fn add_animal(&mut self, tile: Tile) -> AnimalId {
        let id = AnimalId(self.next_animal);
        self.next_animal = self.next_animal.saturating_add(1);
        self.animals.insert(id, SimAnimal { tile, petted: false });
        id
    }

    /// Move an animal.
    pub fn move_animal(&mut self, id: AnimalId, tile: Tile) {
        if let Some(animal) = self.animals.get_mut(&id) {
            animal.tile = tile;
        }
    }

    /// Remove an animal (sold, moved indoors).
    pub fn remove_animal(&mut self, id: AnimalId) {
        self.animals.remove(&id);
    }

    /// Put debris on `tile`. Tough debris always resists clearing.
    pub fn add_debris(&mut self, tile: Tile, tough: bool) {
        self.debris.insert(tile, tough);
    }

    /// Remove whatever crop stands on `tile`, as another actor would.
    pub fn remove_crop(&mut self, tile: Tile) {
        self.crops.remove(&tile);
    }

    /// Advance the farm to a new day.
    pub fn start_day(&mut self) {
        for watered in self.watered.values_mut() {
            *watered = false;
        }
        for crop in self.crops.values_mut() {
            if let Some(days) = crop.regrow_in.as_mut()
                && !crop.ripe
            {
                *days = days.saturating_sub(1);
                if *days == 0 {
                    crop.ripe = true;
                }
            }
        }
        for animal in self.animals.values_mut() {
            animal.petted = false;
        }
    }

    /// Items dropped on the ground so far.
    pub fn dropped_items(&self) -> &[(Tile, ItemStack)] {
        &self.dropped
    }

    /// Number of ripe harvestables.
    pub fn ripe_count(&self) -> usize {
        self.crops.values().filter(|c| c.ripe).count()
    }

    /// Number of remaining debris pieces.
    pub fn debris_count(&self) -> usize {
        self.debris.len()
    }

    /// Number of animals petted today.
    pub fn petted_count(&self) -> usize {
        self.animals.values().filter(|a| a.petted).count()
    }
}

impl BuildingRegistry for SimFarm {
    fn find_buildings(&self, kind: BuildingKind) -> Vec<Footprint> {
        self.buildings
            .iter()
            .filter(|(_, b)| kind == BuildingKind::Any || b.kind == kind)
            .map(|(id, b)| Footprint {
                warehouse: (b.kind == BuildingKind::Warehouse).then_some(*id),
                bounds: b.bounds,
            })
            .collect()
    }

    fn building_bounds(&self, id: WarehouseId) -> Option<TileRect> {
        self.buildings.get(&id).map(|b| b.bounds)
    }

    fn building_at(&self, tile: Tile) -> Option<Footprint> {
        self.buildings
            .iter()
            .find(|(_, b)| b.bounds.contains(tile))
            .map(|(id, b)| Footprint {
                warehouse: (b.kind == BuildingKind::Warehouse).then_some(*id),
                bounds: b.bounds,
            })
    }

    fn write_metadata(
        &mut self,
        id: WarehouseId,
        key: &str,
        value: String,
    ) -> Result<(), WorldError> {
        let building = self
            .buildings
            .get_mut(&id)
            .ok_or(WorldError::BuildingNotFound(id))?;
        building.metadata.insert(key.to_owned(), value);
        Ok(())
    }

    fn metadata(&self, id: WarehouseId) -> BTreeMap<String, String> {
        self.buildings
            .get(&id)
            .map(|b| b.metadata.clone())
            .unwrap_or_default()
    }
}

impl FarmWorld for SimFarm {
    fn in_bounds(&self, tile: Tile) -> bool {
        tile.x >= 0
            && tile.y >= 0
            && i64::from(tile.x) < i64::from(self.width)
            && i64::from(tile.y) < i64::from(self.height)
    }

    fn harvestables(&self) -> Vec<Harvestable> {
        self.crops
            .iter()
            .filter(|(_, c)| c.ripe)
            .map(|(tile, c)| Harvestable {
                tile: *tile,
                kind: c.kind,
            })
            .collect()
    }

    fn harvestable_at(&self, tile: Tile) -> Option<HarvestKind> {
        self.crops.get(&tile).filter(|c| c.ripe).map(|c| c.kind)
    }

    fn dry_tiles(&self) -> Vec<Tile> {
        self.watered
            .iter()
            .filter(|(_, watered)| !**watered)
            .map(|(tile, _)| *tile)
            .collect()
    }

    fn is_dry(&self, tile: Tile) -> bool {
        self.watered.get(&tile) == Some(&false)
    }

    fn animals(&self) -> Vec<AnimalInfo> {
        self.animals
            .iter()
            .map(|(id, a)| AnimalInfo {
                id: *id,
                tile: a.tile,
                petted_today: a.petted,
            })
            .collect()
    }

    fn is_groomable(&self, id: AnimalId) -> bool {
        self.animals.get(&id).is_some_and(|a| !a.petted)
    }

    fn animal_tile(&self, id: AnimalId) -> Option<Tile> {
        self.animals.get(&id).map(|a| a.tile)
    }

    fn clearable_at(&self, tile: Tile) -> bool {
        self.debris.contains_key(&tile)
    }

    fn harvest(&mut self, tile: Tile) -> Option<Vec<ItemStack>> {
        let crop = self.crops.get_mut(&tile).filter(|c| c.ripe)?;
        let quantity = match crop.kind {
            HarvestKind::FruitTree => 3,
            HarvestKind::Crop | HarvestKind::FlowerCrop | HarvestKind::Forage => 1,
        };
        let items = vec![ItemStack::new(crop.item_id.clone(), quantity)];
        let spent = match crop.kind {
            HarvestKind::FruitTree => {
                crop.ripe = false;
                crop.regrow_in = Some(1);
                false
            }
            _ if crop.regrow_in.is_some() => {
                crop.ripe = false;
                crop.regrow_in = Some(REGROW_DAYS);
                false
            }
            HarvestKind::Crop | HarvestKind::FlowerCrop | HarvestKind::Forage => true,
        };
        if spent {
            self.crops.remove(&tile);
        }
        Some(items)
    }

    fn water(&mut self, tile: Tile) -> bool {
        match self.watered.get_mut(&tile) {
            Some(watered) if !*watered => {
                *watered = true;
                true
            }
            _ => false,
        }
    }

    fn groom(&mut self, id: AnimalId) -> bool {
        match self.animals.get_mut(&id) {
            Some(animal) if !animal.petted => {
                animal.petted = true;
                true
            }
            _ => false,
        }
    }

    fn clear(&mut self, tile: Tile) -> ClearOutcome {
        match self.debris.get(&tile) {
            None => ClearOutcome::Gone,
            Some(true) => ClearOutcome::Failed,
            Some(false) => {
                self.debris.remove(&tile);
                ClearOutcome::Cleared
            }
        }
    }

    fn drop_items(&mut self, tile: Tile, items: Vec<ItemStack>) {
        self.dropped
            .extend(items.into_iter().map(|stack| (tile, stack)));
    }
}
