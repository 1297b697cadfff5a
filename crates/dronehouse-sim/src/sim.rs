//! The multi-day simulation loop.
//!
//! Stands in for the game host: owns the farm and the clock, forwards clock
//! events to the scheduler, and at every day boundary saves all warehouses,
//! throws the scheduler away and rebuilds it from building metadata, the
//! way a save and reload would.

use tracing::{debug, info, warn};

use dronehouse_core::{ClockEvent, DroneConfig, DroneScheduler, GameClock, TickSummary};
use dronehouse_types::{Role, Tile, TileRect, WarehouseId};
use dronehouse_world::{FarmWorld, SimFarm};

use crate::error::SimError;
use crate::settings::SimSettings;

/// Side length of the zone queued for each warehouse.
const ZONE_SIZE: u32 = 5;

/// How far from a warehouse the first zone may be placed.
const ZONE_SEARCH_RADIUS: i32 = 30;

/// Counters summed over one in-game day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayTotals {
    /// Ticks run.
    pub ticks: u64,
    /// Agents sent out.
    pub launched: u32,
    /// Work effects applied.
    pub completed: u32,
    /// Agents back inside.
    pub landed: u32,
    /// Trips aborted.
    pub aborted: u32,
}

impl DayTotals {
    fn add(&mut self, summary: &TickSummary) {
        self.ticks = self.ticks.saturating_add(1);
        self.launched = self.launched.saturating_add(summary.launched);
        self.completed = self.completed.saturating_add(summary.completed);
        self.landed = self.landed.saturating_add(summary.landed);
        self.aborted = self.aborted.saturating_add(summary.aborted);
    }
}

/// A running simulation.
#[derive(Debug)]
pub struct Simulation {
    config: DroneConfig,
    settings: SimSettings,
    farm: SimFarm,
    scheduler: DroneScheduler,
    clock: GameClock,
    warehouses: Vec<WarehouseId>,
    totals: DayTotals,
}

impl Simulation {
    /// Build the farm, place the warehouses and start day one.
    pub fn new(config: DroneConfig, settings: SimSettings) -> Result<Self, SimError> {
        let mut farm = SimFarm::new(settings.width, settings.height, settings.seed);
        let mut warehouses = Vec::new();
        for i in 0..settings.warehouses {
            let x = i32::try_from(i.saturating_mul(12)).unwrap_or(i32::MAX).saturating_add(4);
            warehouses.push(farm.add_warehouse(TileRect::new(x, 2, 3, 2))?);
        }
        farm.generate(&settings.layout);

        let clock = GameClock::new(&config.time)?;
        let mut scheduler = DroneScheduler::new(&config);
        scheduler.on_building_list_changed(&mut farm);
        for id in &warehouses {
            let outcome = scheduler.set_drone_count(*id, Role::Farmer, settings.farmers_per_warehouse);
            if !outcome.ok {
                warn!(warehouse = %id, reason = ?outcome.message, "farmer count refused");
            }
        }
        scheduler.on_day_started(&mut farm);

        let mut sim = Self {
            config,
            settings,
            farm,
            scheduler,
            clock,
            warehouses,
            totals: DayTotals::default(),
        };
        if sim.settings.farmers_per_warehouse > 0 {
            sim.queue_zones();
        }
        Ok(sim)
    }

    /// Queue one zone per warehouse around the nearest debris.
    fn queue_zones(&mut self) {
        for id in self.warehouses.clone() {
            let Some(home) = self.scheduler.warehouse(id).map(dronehouse_core::Warehouse::center_tile)
            else {
                continue;
            };
            let Some(tile) = nearest_debris(&self.farm, home) else {
                debug!(warehouse = %id, "no debris in reach, no zone queued");
                continue;
            };
            self.scheduler.begin_selection(id, Some(ZONE_SIZE));
            self.scheduler.add_beacon(tile, &self.farm);
            let outcome = self.scheduler.commit_selection(&self.farm);
            if outcome.ok {
                info!(warehouse = %id, %tile, "zone queued");
            } else {
                warn!(warehouse = %id, reason = ?outcome.message, "zone refused");
                self.scheduler.cancel_selection();
            }
        }
    }

    /// Run until the configured number of days has passed.
    pub fn run(&mut self) -> Result<(), SimError> {
        let dt = self.settings.tick_secs();
        info!(
            days = self.settings.days,
            warehouses = self.warehouses.len(),
            tick_secs = dt,
            "simulation started"
        );
        while self.clock.day() <= self.settings.days {
            let summary = self.scheduler.tick(dt, &mut self.farm);
            self.totals.add(&summary);
            match self.clock.advance(dt)? {
                Some(ClockEvent::TimeChanged(time)) => {
                    self.scheduler.on_time_changed(time, &self.farm);
                }
                Some(ClockEvent::DayStarted(day)) => self.end_of_day(day)?,
                None => {}
            }
        }
        info!("simulation finished");
        Ok(())
    }

    /// Report the day, save, reload from metadata and start the next day.
    fn end_of_day(&mut self, day: u32) -> Result<(), SimError> {
        self.report(day.saturating_sub(1));
        let saved = self.scheduler.save(&mut self.farm)?;
        self.farm.start_day();

        self.scheduler = DroneScheduler::new(&self.config);
        self.scheduler.on_day_started(&mut self.farm);
        info!(day, saved, "state reloaded from building metadata");
        self.totals = DayTotals::default();
        Ok(())
    }

    fn report(&self, day: u32) {
        let t = self.totals;
        info!(
            day,
            ticks = t.ticks,
            launched = t.launched,
            completed = t.completed,
            landed = t.landed,
            aborted = t.aborted,
            ripe_left = self.farm.ripe_count(),
            dry_left = self.farm.dry_tiles().len(),
            debris_left = self.farm.debris_count(),
            petted = self.farm.petted_count(),
            "day summary"
        );
        for wh in self.scheduler.warehouses() {
            let jobs = self.scheduler.farmer_queue(wh.id());
            info!(
                day,
                warehouse = %wh.id(),
                chest_items = wh.chest().item_count(),
                stash_stacks = wh.stash().len(),
                jobs = jobs.len(),
                cleared = jobs.iter().map(|j| j.cleared).sum::<u32>(),
                "warehouse summary"
            );
        }
    }
}

/// Nearest clearable tile to `home` within the search radius.
fn nearest_debris(world: &dyn FarmWorld, home: Tile) -> Option<Tile> {
    (1..=ZONE_SEARCH_RADIUS).find_map(|r| {
        ring(home, r).find(|t| world.in_bounds(*t) && world.clearable_at(*t))
    })
}

/// Tiles at Chebyshev distance `r` from `center`.
fn ring(center: Tile, r: i32) -> impl Iterator<Item = Tile> {
    let span = r.saturating_neg()..=r;
    span.clone().flat_map(move |dy| {
        span.clone().filter_map(move |dx| {
            (dx.abs() == r || dy.abs() == r)
                .then(|| Tile::new(center.x.saturating_add(dx), center.y.saturating_add(dy)))
        })
    })
}
