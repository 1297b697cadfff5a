//! End-to-end scheduler scenarios against the simulated farm.
//!
//! Each test builds a [`SimFarm`], places warehouses, and drives
//! [`DroneScheduler`] tick by tick the way the host would.

// Integration tests use unwrap extensively for clarity -- panicking on
// failure is the correct behavior in test code.
#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc,
    clippy::too_many_lines
)]

use std::collections::BTreeSet;

use dronehouse_core::{CommandOutcome, DroneConfig, DroneScheduler, GameTime};
use dronehouse_types::{
    AgentPhase, HarvestKind, JobPhase, MessageKey, ResourceKind, Role, Tile, TileRect, WarehouseId,
};
use dronehouse_world::{BuildingRegistry, FarmWorld, SimFarm};

/// One tick at 60 frames per second.
const DT: f64 = 1.0 / 60.0;

fn quick_config() -> DroneConfig {
    let mut config = DroneConfig::default();
    config.general.scan_interval_ticks = 1;
    config
}

fn farm_with_warehouse() -> (SimFarm, WarehouseId) {
    let mut farm = SimFarm::new(64, 64, 11);
    let id = farm.add_warehouse(TileRect::new(10, 10, 3, 2)).unwrap();
    (farm, id)
}

fn run(scheduler: &mut DroneScheduler, farm: &mut SimFarm, ticks: u32) {
    for _ in 0..ticks {
        scheduler.tick(DT, farm);
    }
}

// =========================================================================
// Harvest cycle
// =========================================================================

#[test]
fn harvester_brings_a_crop_home() {
    let (mut farm, id) = farm_with_warehouse();
    farm.plant(Tile::new(11, 14), HarvestKind::Crop, "(O)24", false);
    let mut scheduler = DroneScheduler::new(&quick_config());
    scheduler.on_building_list_changed(&mut farm);

    run(&mut scheduler, &mut farm, 2);
    assert_eq!(scheduler.ledger().used(id, ResourceKind::Cargo), 1);
    assert!(scheduler.lid_open(id));

    run(&mut scheduler, &mut farm, 60 * 10);
    let chest = scheduler.chest_contents(id);
    assert_eq!(chest.len(), 1);
    assert_eq!(chest[0].item_id, "(O)24");
    assert_eq!(scheduler.ledger().used(id, ResourceKind::Cargo), 0);
    assert_eq!(farm.ripe_count(), 0);
    assert!(!scheduler.any_lid_open());
}

#[test]
fn flower_crops_are_skipped_by_default() {
    let (mut farm, id) = farm_with_warehouse();
    farm.plant(Tile::new(11, 14), HarvestKind::FlowerCrop, "(O)421", false);
    let mut scheduler = DroneScheduler::new(&quick_config());
    scheduler.on_building_list_changed(&mut farm);

    run(&mut scheduler, &mut farm, 60 * 5);
    assert!(scheduler.chest_contents(id).is_empty());
    assert_eq!(farm.ripe_count(), 1);
}

#[test]
fn full_chest_keeps_the_load_and_the_cargo_slot() {
    let mut config = quick_config();
    config.capacities.chest_slots = 1;
    config.capacities.max_stack = 1;
    let (mut farm, id) = farm_with_warehouse();
    farm.plant(Tile::new(11, 14), HarvestKind::Crop, "(O)24", false);
    farm.plant(Tile::new(12, 14), HarvestKind::Crop, "(O)16", false);
    let mut scheduler = DroneScheduler::new(&config);
    scheduler.on_building_list_changed(&mut farm);

    run(&mut scheduler, &mut farm, 60 * 20);
    let chest = scheduler.chest_contents(id);
    assert_eq!(chest.len(), 1);
    assert_eq!(chest[0].item_id, "(O)24");
    assert_eq!(farm.ripe_count(), 0);
    let harvester = scheduler
        .agent_views(id)
        .into_iter()
        .find(|v| v.role == Role::Harvester)
        .unwrap();
    assert!(harvester.loaded);
    assert_eq!(scheduler.ledger().used(id, ResourceKind::Cargo), 1);

    // Still loaded, so it does not go out again.
    farm.plant(Tile::new(13, 14), HarvestKind::Crop, "(O)18", false);
    run(&mut scheduler, &mut farm, 60 * 10);
    assert_eq!(farm.ripe_count(), 1);
    assert_eq!(scheduler.ledger().used(id, ResourceKind::Cargo), 1);
    assert!(scheduler.held_targets().is_empty());
}

// =========================================================================
// Watering
// =========================================================================

#[test]
fn waterer_works_the_dry_list_and_refills_at_the_hatch() {
    let mut config = quick_config();
    config.capacities.water_charges = 1;
    let (mut farm, id) = farm_with_warehouse();
    let listed = Tile::new(11, 14);
    let late = Tile::new(12, 15);
    farm.till(listed, false);
    let mut scheduler = DroneScheduler::new(&config);
    scheduler.on_building_list_changed(&mut farm);
    scheduler.on_time_changed(GameTime::new(610).unwrap(), &farm);
    farm.till(late, false);
    assert!(scheduler.dry_list().contains(listed));
    assert!(!scheduler.dry_list().contains(late));

    run(&mut scheduler, &mut farm, 60);
    assert_eq!(scheduler.ledger().balance(id, ResourceKind::Water), Some(0));

    run(&mut scheduler, &mut farm, 60 * 9);
    assert!(!farm.is_dry(listed));
    assert!(farm.is_dry(late), "tiles off the dry list are not targeted");
    assert_eq!(scheduler.ledger().balance(id, ResourceKind::Water), Some(1));
    assert!(scheduler.agent_views(id).iter().all(|v| v.phase == AgentPhase::Idle));

    scheduler.on_time_changed(GameTime::new(620).unwrap(), &farm);
    run(&mut scheduler, &mut farm, 60 * 10);
    assert!(!farm.is_dry(late));
    assert_eq!(scheduler.ledger().balance(id, ResourceKind::Water), Some(1));
}

// =========================================================================
// Zone selection
// =========================================================================

#[test]
fn commit_rechecks_zone_size_against_current_settings() {
    let mut config = quick_config();
    config.fleet.default_farmers = 1;
    config.farmer.max_zone_tiles = 50;
    let (mut farm, id) = farm_with_warehouse();
    let mut scheduler = DroneScheduler::new(&config);
    scheduler.on_building_list_changed(&mut farm);

    assert!(scheduler.begin_selection(id, Some(5)).ok);
    assert!(scheduler.add_beacon(Tile::new(20, 20), &farm).ok);
    scheduler.cycle_size();
    scheduler.cycle_size();
    scheduler.cycle_size();
    assert_eq!(scheduler.current_size_text().as_deref(), Some("3x3"));
    assert!(scheduler.add_beacon(Tile::new(30, 20), &farm).ok);
    // Overlaps the first square in three tiles.
    assert!(scheduler.add_beacon(Tile::new(23, 20), &farm).ok);
    scheduler.cycle_size();
    scheduler.cycle_size();
    scheduler.cycle_size();
    assert!(scheduler.add_beacon(Tile::new(35, 35), &farm).ok);
    assert_eq!(scheduler.beacon_preview_squares().len(), 4);

    config.farmer.max_zone_tiles = 40;
    scheduler.set_config(&config);
    assert_eq!(
        scheduler.commit_selection(&farm),
        CommandOutcome::rejected(MessageKey::ZoneTooLarge)
    );
    assert!(scheduler.is_selection_active());
    assert!(scheduler.farmer_queue(id).is_empty());

    config.farmer.max_zone_tiles = 41;
    scheduler.set_config(&config);
    assert_eq!(
        scheduler.commit_selection(&farm),
        CommandOutcome::applied(Some(MessageKey::JobQueued))
    );
    assert!(!scheduler.is_selection_active());
    assert_eq!(scheduler.farmer_queue(id).len(), 1);
}

#[test]
fn empty_selection_cannot_be_committed() {
    let mut config = quick_config();
    config.fleet.default_farmers = 1;
    let (mut farm, id) = farm_with_warehouse();
    let mut scheduler = DroneScheduler::new(&config);
    scheduler.on_building_list_changed(&mut farm);

    scheduler.begin_selection(id, None);
    assert_eq!(
        scheduler.commit_selection(&farm),
        CommandOutcome::rejected(MessageKey::NoBeacons)
    );
    assert_eq!(scheduler.commit_selection(&farm).message, Some(MessageKey::NoBeacons));
    scheduler.cancel_selection();
    assert_eq!(scheduler.commit_selection(&farm), CommandOutcome::ignored());
}

#[test]
fn tough_debris_is_given_up_and_counted() {
    let mut config = quick_config();
    config.fleet.default_farmers = 1;
    let (mut farm, id) = farm_with_warehouse();
    farm.add_debris(Tile::new(15, 15), true);
    farm.add_debris(Tile::new(16, 16), false);
    let mut scheduler = DroneScheduler::new(&config);
    scheduler.on_building_list_changed(&mut farm);

    scheduler.begin_selection(id, Some(3));
    scheduler.add_beacon(Tile::new(15, 15), &farm);
    assert!(scheduler.commit_selection(&farm).ok);
    run(&mut scheduler, &mut farm, 60 * 40);

    let job = &scheduler.farmer_queue(id)[0];
    assert_eq!(job.phase, JobPhase::Done);
    assert_eq!(job.cleared, 1);
    assert_eq!(job.failed, 1);
    assert_eq!(farm.debris_count(), 1);
}

fn farmers_sent_to(debris: &[(i32, i32)]) -> (DroneScheduler, SimFarm, WarehouseId) {
    let mut config = quick_config();
    config.fleet.default_farmers = 2;
    config.farmer.batch_size = 2;
    let (mut farm, id) = farm_with_warehouse();
    for (x, y) in debris {
        farm.add_debris(Tile::new(*x, *y), false);
    }
    let mut scheduler = DroneScheduler::new(&config);
    scheduler.on_building_list_changed(&mut farm);
    scheduler.begin_selection(id, Some(3));
    scheduler.add_beacon(Tile::new(20, 20), &farm);
    assert!(scheduler.commit_selection(&farm).ok);
    scheduler.tick(DT, &mut farm);
    (scheduler, farm, id)
}

#[test]
fn second_farmer_joins_only_a_zone_larger_than_the_batch() {
    let (scheduler, _, id) = farmers_sent_to(&[(19, 19), (20, 19), (21, 19)]);
    assert_eq!(scheduler.farmer_queue(id)[0].assigned, 1);

    let (mut scheduler, mut farm, id) = farmers_sent_to(&[(19, 19), (20, 19), (21, 19), (19, 20)]);
    assert_eq!(scheduler.farmer_queue(id)[0].assigned, 2);
    let held = scheduler.held_targets();
    assert_eq!(held.len(), 2);
    assert_ne!(held[0].1, held[1].1);

    run(&mut scheduler, &mut farm, 60 * 60);
    assert_eq!(farm.debris_count(), 0);
    let job = &scheduler.farmer_queue(id)[0];
    assert_eq!(job.phase, JobPhase::Done);
    assert_eq!(job.cleared, 4);
}

#[test]
fn zone_under_a_no_fly_pad_is_given_up_and_frees_the_farmer() {
    let mut config = quick_config();
    config.fleet.default_farmers = 1;
    let (mut farm, id) = farm_with_warehouse();
    farm.add_building(TileRect::new(30, 10, 2, 2)).unwrap();
    // Outside the barn, inside its one-tile pad.
    farm.add_debris(Tile::new(31, 12), false);
    farm.add_debris(Tile::new(20, 20), false);
    let mut scheduler = DroneScheduler::new(&config);
    scheduler.on_building_list_changed(&mut farm);

    scheduler.begin_selection(id, Some(1));
    assert!(scheduler.add_beacon(Tile::new(31, 12), &farm).ok);
    assert!(scheduler.commit_selection(&farm).ok);
    run(&mut scheduler, &mut farm, 60 * 20);
    let job = &scheduler.farmer_queue(id)[0];
    assert_eq!(job.phase, JobPhase::Queued);
    assert_eq!(job.assigned, 0);
    assert!(job.elapsed.abs() < f64::EPSILON);

    scheduler.begin_selection(id, Some(1));
    scheduler.add_beacon(Tile::new(20, 20), &farm);
    assert_eq!(
        scheduler.commit_selection(&farm),
        CommandOutcome::rejected(MessageKey::NoFreeFarmer)
    );
    scheduler.cancel_selection();

    scheduler.on_time_changed(GameTime::new(1200).unwrap(), &farm);
    assert!(scheduler.farmer_queue(id).is_empty());

    scheduler.begin_selection(id, Some(1));
    scheduler.add_beacon(Tile::new(20, 20), &farm);
    assert_eq!(
        scheduler.commit_selection(&farm),
        CommandOutcome::applied(Some(MessageKey::JobQueued))
    );
    run(&mut scheduler, &mut farm, 60 * 30);
    assert_eq!(farm.debris_count(), 1);
    assert!(farm.clearable_at(Tile::new(31, 12)));
}

// =========================================================================
// Day rollover
// =========================================================================

#[test]
fn day_start_clears_reservations_but_keeps_balances() {
    let (mut farm, id) = farm_with_warehouse();
    let animal = farm.add_animal(Tile::new(14, 12));
    let mut scheduler = DroneScheduler::new(&quick_config());
    scheduler.on_building_list_changed(&mut farm);

    run(&mut scheduler, &mut farm, 60 * 10);
    assert!(scheduler.ledger().reservations().is_reserved(animal));
    assert_eq!(scheduler.ledger().balance(id, ResourceKind::PetCharge), Some(9));

    farm.start_day();
    scheduler.on_day_started(&mut farm);
    assert!(scheduler.ledger().reservations().is_empty());
    assert_eq!(scheduler.ledger().balance(id, ResourceKind::PetCharge), Some(9));
}

#[test]
fn day_start_parks_agents_in_flight() {
    let (mut farm, id) = farm_with_warehouse();
    farm.plant(Tile::new(30, 30), HarvestKind::Crop, "(O)24", false);
    let mut scheduler = DroneScheduler::new(&quick_config());
    scheduler.on_building_list_changed(&mut farm);

    run(&mut scheduler, &mut farm, 30);
    assert_eq!(scheduler.held_targets().len(), 1);
    scheduler.on_day_started(&mut farm);
    assert!(scheduler.held_targets().is_empty());
    assert!(!scheduler.any_lid_open());
    assert_eq!(scheduler.ledger().used(id, ResourceKind::Cargo), 0);
}

// =========================================================================
// Persistence
// =========================================================================

#[test]
fn save_and_reload_restores_every_warehouse() {
    let mut config = quick_config();
    config.fleet.default_farmers = 1;
    let (mut farm, id) = farm_with_warehouse();
    farm.plant(Tile::new(11, 14), HarvestKind::Crop, "(O)24", false);
    farm.add_debris(Tile::new(40, 40), false);
    let mut scheduler = DroneScheduler::new(&config);
    scheduler.on_building_list_changed(&mut farm);
    scheduler.set_drone_count(id, Role::Waterer, 2);
    run(&mut scheduler, &mut farm, 60 * 10);

    scheduler.begin_selection(id, Some(1));
    scheduler.add_beacon(Tile::new(40, 40), &farm);
    assert!(scheduler.commit_selection(&farm).ok);
    assert_eq!(scheduler.save(&mut farm).unwrap(), 1);
    assert!(farm.metadata(id).contains_key("dronehouse.schema"));

    let mut reloaded = DroneScheduler::new(&config);
    reloaded.on_building_list_changed(&mut farm);
    assert_eq!(reloaded.record_of(id), scheduler.record_of(id));
    assert_eq!(reloaded.agent_views(id).len(), 5);
    assert_eq!(reloaded.farmer_queue(id), scheduler.farmer_queue(id));
}

// =========================================================================
// Warehouse lifecycle
// =========================================================================

#[test]
fn removing_a_warehouse_drops_its_items() {
    let (mut farm, id) = farm_with_warehouse();
    farm.plant(Tile::new(11, 14), HarvestKind::Crop, "(O)24", false);
    let mut scheduler = DroneScheduler::new(&quick_config());
    scheduler.on_building_list_changed(&mut farm);
    run(&mut scheduler, &mut farm, 60 * 10);
    assert_eq!(scheduler.chest_contents(id).len(), 1);

    farm.remove_building(id).unwrap();
    scheduler.on_building_list_changed(&mut farm);
    assert!(scheduler.warehouse(id).is_none());
    assert_eq!(scheduler.ledger().balance(id, ResourceKind::Cargo), None);
    let dropped = farm.dropped_items();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].1.item_id, "(O)24");
}

#[test]
fn removing_the_owner_cancels_its_selection() {
    let mut config = quick_config();
    config.fleet.default_farmers = 1;
    let (mut farm, id) = farm_with_warehouse();
    let mut scheduler = DroneScheduler::new(&config);
    scheduler.on_building_list_changed(&mut farm);
    scheduler.begin_selection(id, None);

    farm.remove_building(id).unwrap();
    scheduler.on_building_list_changed(&mut farm);
    assert!(!scheduler.is_selection_active());
}

// =========================================================================
// Claims
// =========================================================================

#[test]
fn no_target_is_ever_held_twice() {
    let (mut farm, first) = farm_with_warehouse();
    let second = farm.add_warehouse(TileRect::new(30, 10, 3, 2)).unwrap();
    for x in 14..26 {
        farm.plant(Tile::new(x, 20), HarvestKind::Crop, "(O)24", false);
        farm.till(Tile::new(x, 22), false);
    }
    let mut scheduler = DroneScheduler::new(&quick_config());
    scheduler.on_building_list_changed(&mut farm);
    for id in [first, second] {
        scheduler.set_drone_count(id, Role::Harvester, 3);
        scheduler.set_drone_count(id, Role::Waterer, 3);
    }
    scheduler.on_day_started(&mut farm);

    for _ in 0..60 * 30 {
        scheduler.tick(DT, &mut farm);
        let held = scheduler.held_targets();
        let unique: BTreeSet<_> = held.iter().map(|(_, target)| *target).collect();
        assert_eq!(unique.len(), held.len());
    }
    assert_eq!(farm.ripe_count(), 0);
    assert!(farm.dry_tiles().is_empty());
}
