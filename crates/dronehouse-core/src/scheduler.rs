//! The drone scheduler.
//!
//! [`DroneScheduler`] owns every warehouse, the charge ledger, the per-tick
//! claim set, the selection session and the rebuilt caches. The host drives
//! it through four entry points:
//!
//! 1. [`DroneScheduler::tick`] -- once per frame. Re-seeds the claim set,
//!    validates held targets, steps every agent, applies finished work and,
//!    every `scan_interval_ticks`, launches idle agents at new targets.
//! 2. [`DroneScheduler::on_time_changed`] -- every ten in-game minutes.
//!    Rebuilds the dry list, refreshes pet reservations and trims farmer
//!    queues on their configured cadences.
//! 3. [`DroneScheduler::on_day_started`] -- once per in-game day.
//! 4. [`DroneScheduler::on_building_list_changed`] -- when buildings are
//!    placed, moved or removed.
//!
//! Input commands return a [`CommandOutcome`] and never fail; queries expose
//! what the rendering layer draws.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, trace, warn};

use dronehouse_agents::{Agent, AgentError, AgentView, RoleProfile, StepEvent, TargetRef};
use dronehouse_ledger::{AuditResult, ChargeLedger, Counter, audit::audit};
use dronehouse_types::{
    AgentId, ItemStack, JobPhase, MessageKey, Position, ResourceKind, Role, Tile, TileRect,
    WarehouseId, WorkPhase,
};
use dronehouse_world::{
    BuildingKind, BuildingRegistry, Chest, ClearOutcome, DryList, FarmHost, FarmWorld, NoFlyList,
};

use crate::claims::ClaimSet;
use crate::clock::GameTime;
use crate::command::CommandOutcome;
use crate::config::DroneConfig;
use crate::jobs::{FarmerJob, FarmerQueue, JobView};
use crate::persistence::{self, ChestRecord, JobRecord, PersistError, WarehouseRecord};
use crate::selection::Selector;
use crate::targeting::{self, SearchContext};
use crate::warehouse::{Roster, Warehouse};

/// Counts from one [`DroneScheduler::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Agents sent out.
    pub launched: u32,
    /// Work effects applied (harvests, waterings, groomings, tiles cleared
    /// or given up).
    pub completed: u32,
    /// Agents back inside.
    pub landed: u32,
    /// Trips aborted because the target went away.
    pub aborted: u32,
}

/// Borrowed scheduler state shared by the per-agent steps.
struct Env<'a> {
    config: &'a DroneConfig,
    ledger: &'a mut ChargeLedger,
    claims: &'a mut ClaimSet,
    dry_list: &'a mut DryList,
    no_fly: &'a NoFlyList,
    summary: &'a mut TickSummary,
}

/// Top-level per-tick orchestrator.
#[derive(Debug)]
pub struct DroneScheduler {
    config: DroneConfig,
    warehouses: BTreeMap<WarehouseId, Warehouse>,
    ledger: ChargeLedger,
    claims: ClaimSet,
    selector: Selector,
    dry_list: DryList,
    no_fly: NoFlyList,
    tick_count: u64,
    deferred_rebuild: Option<u32>,
}

impl DroneScheduler {
    /// A scheduler with no warehouses. The configuration is sanitised.
    pub fn new(config: &DroneConfig) -> Self {
        Self {
            config: config.sanitized(),
            warehouses: BTreeMap::new(),
            ledger: ChargeLedger::new(),
            claims: ClaimSet::new(),
            selector: Selector::new(),
            dry_list: DryList::new(),
            no_fly: NoFlyList::new(),
            tick_count: 0,
            deferred_rebuild: None,
        }
    }

    /// The active (sanitised) configuration.
    pub const fn config(&self) -> &DroneConfig {
        &self.config
    }

    /// Apply a new configuration.
    ///
    /// Ledger maxima, chest limits and rosters are adjusted in place;
    /// surplus agents are retired and farmer jobs beyond the farmer count
    /// dropped.
    pub fn set_config(&mut self, config: &DroneConfig) {
        self.config = config.sanitized();
        let ids: Vec<WarehouseId> = self.warehouses.keys().copied().collect();
        for id in &ids {
            self.open_accounts(*id);
        }
        for wh in self.warehouses.values_mut() {
            wh.resize_chest(&self.config.capacities);
            wh.roster = wh.roster.clamped(&self.config.fleet);
            enforce_job_limit(wh);
            let retired = wh.reconcile_agents();
            stow_retired(&mut self.ledger, wh, retired);
        }
        info!(warehouses = ids.len(), "configuration applied");
    }

    // -----------------------------------------------------------------------
    // Warehouse lifecycle
    // -----------------------------------------------------------------------

    /// Create warehouses for new buildings and clean up vanished ones.
    ///
    /// New warehouses are rebuilt from the metadata stored on the building;
    /// known ones pick up their current bounds.
    pub fn sync_with_buildings<H: FarmHost>(&mut self, host: &mut H) {
        let found: BTreeMap<WarehouseId, TileRect> = host
            .find_buildings(BuildingKind::Warehouse)
            .into_iter()
            .filter_map(|fp| fp.warehouse)
            .filter_map(|id| host.building_bounds(id).map(|bounds| (id, bounds)))
            .collect();
        let gone: Vec<WarehouseId> = self
            .warehouses
            .keys()
            .filter(|id| !found.contains_key(id))
            .copied()
            .collect();
        for id in &gone {
            self.remove_warehouse(*id, host);
        }
        let mut added = 0_u32;
        for (id, bounds) in found {
            if let Some(wh) = self.warehouses.get_mut(&id) {
                wh.bounds = bounds;
            } else {
                let metadata = host.metadata(id);
                self.load_warehouse(id, bounds, &metadata);
                added = added.saturating_add(1);
            }
        }
        if added > 0 || !gone.is_empty() {
            self.no_fly
                .rebuild(&*host, self.config.general.no_fly_pad_tiles);
            info!(
                added,
                removed = gone.len(),
                total = self.warehouses.len(),
                "warehouses synced"
            );
        }
    }

    /// The host placed, moved or removed a building.
    pub fn on_building_list_changed<H: FarmHost>(&mut self, host: &mut H) {
        self.sync_with_buildings(host);
        self.no_fly
            .rebuild(&*host, self.config.general.no_fly_pad_tiles);
    }

    fn load_warehouse(
        &mut self,
        id: WarehouseId,
        bounds: TileRect,
        metadata: &BTreeMap<String, String>,
    ) {
        let caps = &self.config.capacities;
        let record = persistence::decode(id, metadata, &self.config.fleet);
        let roster = record
            .as_ref()
            .map_or_else(|| Roster::from_fleet(&self.config.fleet), |r| r.roster.clone());
        let mut wh = Warehouse::new(id, bounds, roster, caps);
        self.open_accounts(id);
        if let Some(record) = record {
            for (kind, balance) in record.ledger {
                if let Err(err) = self.ledger.set_balance(id, kind, balance) {
                    warn!(warehouse = %id, error = %err, "saved balance ignored");
                }
            }
            let caps = &self.config.capacities;
            let (chest, overflow) =
                Chest::restore(caps.chest_slots, caps.max_stack, record.chest.stacks);
            wh.chest = chest;
            wh.stash_items(overflow);
            wh.stash_items(record.chest.stash);
            for job in record.jobs {
                wh.jobs.push(job.into_job());
            }
        }
        wh.reconcile_agents();
        info!(
            warehouse = %id,
            agents = wh.agents.len(),
            jobs = wh.jobs.len(),
            "warehouse loaded"
        );
        self.warehouses.insert(id, wh);
    }

    fn open_accounts(&mut self, id: WarehouseId) {
        let caps = &self.config.capacities;
        for (kind, max) in [
            (ResourceKind::Cargo, caps.harvest_cargo),
            (ResourceKind::Water, caps.water_charges),
            (ResourceKind::PetCharge, caps.pet_charges),
        ] {
            if let Err(err) = self.ledger.open(id, kind, max) {
                warn!(warehouse = %id, error = %err, "ledger account not opened");
            }
        }
    }

    /// Discard a warehouse and everything it owns.
    ///
    /// Chest, stash and carried items are dropped at the building so nothing
    /// is lost. A selection owned by the warehouse is cancelled. Returns
    /// whether the warehouse existed.
    pub fn remove_warehouse<H: FarmHost>(&mut self, id: WarehouseId, host: &mut H) -> bool {
        let Some(mut wh) = self.warehouses.remove(&id) else {
            return false;
        };
        let items = wh.take_everything();
        let dropped = items.len();
        if !items.is_empty() {
            host.drop_items(wh.center_tile(), items);
        }
        for target in wh.agents.iter().filter_map(Agent::target) {
            self.claims.release(&target);
        }
        self.ledger.close_warehouse(id);
        if self.selector.cancel_if_owned_by(id) {
            info!(warehouse = %id, "selection cancelled with its warehouse");
        }
        info!(
            warehouse = %id,
            agents = wh.agents.len(),
            jobs = wh.jobs.len(),
            dropped_stacks = dropped,
            "warehouse removed"
        );
        true
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the whole system by `dt` seconds.
    pub fn tick<H: FarmHost>(&mut self, dt: f64, host: &mut H) -> TickSummary {
        self.tick_count = self.tick_count.saturating_add(1);
        let mut summary = TickSummary {
            tick: self.tick_count,
            ..TickSummary::default()
        };
        self.run_deferred_rebuild(&*host);

        let held: Vec<TargetRef> = self
            .warehouses
            .values()
            .flat_map(|wh| wh.agents.iter().filter_map(Agent::target))
            .collect();
        self.claims.begin_tick(held);

        let interval = u64::from(self.config.general.scan_interval_ticks);
        let scan = self.tick_count.checked_rem(interval) == Some(0);

        let Self {
            config,
            warehouses,
            ledger,
            claims,
            dry_list,
            no_fly,
            ..
        } = self;
        let mut env = Env {
            config,
            ledger,
            claims,
            dry_list,
            no_fly,
            summary: &mut summary,
        };
        for wh in warehouses.values_mut() {
            step_warehouse(wh, dt, &mut env, &mut *host);
        }
        if scan {
            for wh in warehouses.values_mut() {
                scan_warehouse(wh, &mut env, &*host);
            }
        }
        for wh in warehouses.values_mut() {
            for job in wh.jobs.iter_mut() {
                job.advance(dt);
            }
        }
        summary
    }

    fn run_deferred_rebuild<H: FarmHost>(&mut self, host: &H) {
        match self.deferred_rebuild {
            Some(0) => {
                self.deferred_rebuild = None;
                self.rebuild_caches(host);
                debug!("deferred cache rebuild done");
            }
            Some(n) => self.deferred_rebuild = Some(n.saturating_sub(1)),
            None => {}
        }
    }

    fn rebuild_caches<H: FarmHost>(&mut self, host: &H) {
        self.dry_list.rebuild(host);
        self.no_fly
            .rebuild(host, self.config.general.no_fly_pad_tiles);
    }

    /// React to the in-game clock advancing.
    pub fn on_time_changed<H: FarmHost>(&mut self, time: GameTime, host: &H) {
        let cadence = &self.config.cadence;
        let (dry, pets, trim) = (
            time.is_on_cadence(cadence.dry_list_minutes),
            time.is_on_cadence(cadence.pet_refresh_minutes),
            time.is_on_cadence(cadence.trim_minutes),
        );
        if dry {
            self.dry_list.rebuild(host);
        }
        if pets {
            let petted = host
                .animals()
                .into_iter()
                .filter(|a| a.petted_today)
                .map(|a| a.id);
            self.ledger.reservations_mut().refresh(petted);
            debug!(%time, reserved = self.ledger.reservations().len(), "pet reservations refreshed");
        }
        if trim {
            for wh in self.warehouses.values_mut() {
                let held: BTreeSet<Tile> = wh
                    .agents
                    .iter()
                    .filter_map(|a| match a.target() {
                        Some(TargetRef::Debris(tile)) => Some(tile),
                        _ => None,
                    })
                    .collect();
                let report = wh.jobs.trim(host, &self.no_fly, &held);
                if report.pruned > 0 {
                    debug!(warehouse = %wh.id, pruned = report.pruned, "finished jobs pruned");
                }
            }
        }
    }

    /// Start-of-day reset.
    ///
    /// Syncs with the buildings, resets the ledger's daily state, parks every
    /// agent (payloads go to the stash, unspent reservations are refunded),
    /// frees every farmer job for reassignment, cancels the selection and
    /// rebuilds the caches now and again after `deferred_rebuild_ticks`.
    pub fn on_day_started<H: FarmHost>(&mut self, host: &mut H) {
        self.sync_with_buildings(host);
        self.ledger
            .daily_reset(self.config.cadence.refill_charges_daily);

        for wh in self.warehouses.values_mut() {
            let mut stashed = Vec::new();
            for agent in &mut wh.agents {
                if let Some(kind) = agent.take_reservation() {
                    self.ledger.refill(wh.id, kind, 1);
                }
                let payload = agent.reset_idle();
                if !payload.is_empty() {
                    self.ledger.refill(wh.id, ResourceKind::Cargo, 1);
                    stashed.extend(payload);
                }
            }
            wh.stash_items(stashed);
            wh.jobs.release_all();
        }
        self.selector.cancel();
        self.claims.begin_tick(std::iter::empty());
        self.rebuild_caches(&*host);
        self.deferred_rebuild = Some(self.config.general.deferred_rebuild_ticks);

        let live: BTreeSet<WarehouseId> = self.warehouses.keys().copied().collect();
        if let AuditResult::Anomaly(anomaly) = audit(&self.ledger, &live) {
            warn!(
                out_of_bounds = anomaly.out_of_bounds.len(),
                orphaned = anomaly.orphaned.len(),
                "{}",
                anomaly.message
            );
        }
        info!(warehouses = self.warehouses.len(), "day started");
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// The record a save would write for `id`.
    ///
    /// Agents are not persisted: carried items are saved with the stash and
    /// unspent reservations are saved as refunded.
    pub fn record_of(&self, id: WarehouseId) -> Option<WarehouseRecord> {
        let wh = self.warehouses.get(&id)?;
        let mut ledger = self.ledger.balances_of(id);
        let mut stash = wh.stash.clone();
        let mut credit = |kind: ResourceKind| {
            let max = self.ledger.counter(id, kind).map_or(0, |c: Counter| c.max());
            let entry = ledger.entry(kind).or_insert(0);
            *entry = entry.saturating_add(1).min(max);
        };
        for agent in &wh.agents {
            if let Some(kind) = agent.reserved() {
                credit(kind);
            }
            if !agent.payload().is_empty() {
                stash.extend(agent.payload().iter().cloned());
                credit(ResourceKind::Cargo);
            }
        }
        Some(WarehouseRecord {
            roster: wh.roster.clone(),
            ledger,
            chest: ChestRecord {
                stacks: wh.chest.contents().to_vec(),
                stash,
            },
            jobs: wh.jobs.iter().map(JobRecord::from).collect(),
        })
    }

    /// Write every warehouse's record into the host metadata store.
    ///
    /// Returns the number of warehouses saved.
    pub fn save<R: BuildingRegistry>(&self, registry: &mut R) -> Result<usize, PersistError> {
        let mut saved = 0_usize;
        for id in self.warehouses.keys() {
            let Some(record) = self.record_of(*id) else {
                continue;
            };
            for (key, value) in persistence::encode(&record)? {
                registry.write_metadata(*id, &key, value)?;
            }
            saved = saved.saturating_add(1);
        }
        info!(warehouses = saved, "state saved");
        Ok(saved)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Start a zone selection on `warehouse`.
    ///
    /// `size` defaults to the last size used, then the configured start size.
    pub fn begin_selection(&mut self, warehouse: WarehouseId, size: Option<u32>) -> CommandOutcome {
        let Some(wh) = self.warehouses.get(&warehouse) else {
            return CommandOutcome::rejected(MessageKey::NoWarehouse);
        };
        let size = size
            .or_else(|| self.selector.last_size())
            .unwrap_or(self.config.farmer.start_size);
        let outcome = self.selector.begin(
            warehouse,
            wh.roster.farmer_count(),
            size,
            &self.config.farmer,
        );
        log_outcome("begin selection", outcome);
        outcome
    }

    /// Cancel the selection if `warehouse` owns it, otherwise begin one.
    pub fn toggle_selection(&mut self, warehouse: WarehouseId) -> CommandOutcome {
        if self.selector.owner() == Some(warehouse) {
            return self.cancel_selection();
        }
        self.begin_selection(warehouse, None)
    }

    /// Place a beacon at `tile`.
    pub fn add_beacon<W: FarmWorld>(&mut self, tile: Tile, world: &W) -> CommandOutcome {
        let Some(owner) = self.selector.owner() else {
            return CommandOutcome::ignored();
        };
        let Some(home) = self.warehouses.get(&owner).map(Warehouse::center_tile) else {
            return CommandOutcome::ignored();
        };
        let outcome = if !self.config.general.work_off_farm && !world.in_bounds(tile) {
            CommandOutcome::rejected(MessageKey::BeaconTooFar)
        } else {
            self.selector.add_beacon(tile, home, &self.config.farmer)
        };
        log_outcome("add beacon", outcome);
        outcome
    }

    /// Undo the last beacon.
    pub fn remove_last_beacon(&mut self) -> CommandOutcome {
        self.selector.remove_last()
    }

    /// Switch to the next beacon size.
    pub fn cycle_size(&mut self) -> CommandOutcome {
        self.selector.cycle_size(&self.config.farmer)
    }

    /// Discard the selection.
    pub fn cancel_selection(&mut self) -> CommandOutcome {
        self.selector.cancel()
    }

    /// Turn the selection into a farmer job.
    ///
    /// On any rejection nothing changes and the session stays open for
    /// correction.
    pub fn commit_selection<W: FarmWorld>(&mut self, world: &W) -> CommandOutcome {
        let Some(session) = self.selector.session() else {
            return CommandOutcome::ignored();
        };
        let outcome = if session.beacons().is_empty() {
            CommandOutcome::rejected(MessageKey::NoBeacons)
        } else if session.zone_tile_count()
            > usize::try_from(self.config.farmer.max_zone_tiles).unwrap_or(usize::MAX)
        {
            CommandOutcome::rejected(MessageKey::ZoneTooLarge)
        } else {
            match self.warehouses.get(&session.warehouse()) {
                None => CommandOutcome::rejected(MessageKey::NoWarehouse),
                Some(wh) => {
                    let farmers = usize::try_from(wh.roster.farmer_count()).unwrap_or(0);
                    if wh.jobs.active_count() >= farmers {
                        CommandOutcome::rejected(MessageKey::NoFreeFarmer)
                    } else {
                        CommandOutcome::applied(Some(MessageKey::JobQueued))
                    }
                }
            }
        };
        if !outcome.ok {
            log_outcome("commit selection", outcome);
            return outcome;
        }
        let Some(session) = self.selector.finish() else {
            return CommandOutcome::ignored();
        };
        let Some(wh) = self.warehouses.get_mut(&session.warehouse()) else {
            return CommandOutcome::rejected(MessageKey::NoWarehouse);
        };
        let job = FarmerJob::new(wh.id, session.beacons().to_vec(), world);
        info!(
            warehouse = %wh.id,
            job = %job.id(),
            beacons = session.beacons().len(),
            tiles = job.remaining().len(),
            "farmer job queued"
        );
        wh.jobs.push(job);
        outcome
    }

    /// Change how many agents of `role` a warehouse keeps.
    pub fn set_drone_count(
        &mut self,
        warehouse: WarehouseId,
        role: Role,
        count: u32,
    ) -> CommandOutcome {
        if count > self.config.max_count(role) {
            return CommandOutcome::rejected(MessageKey::RosterLimit);
        }
        let Some(wh) = self.warehouses.get_mut(&warehouse) else {
            return CommandOutcome::rejected(MessageKey::NoWarehouse);
        };
        wh.roster.set(role, count);
        enforce_job_limit(wh);
        let retired = wh.reconcile_agents();
        stow_retired(&mut self.ledger, wh, retired);
        if role.is_farmer() && count == 0 && self.selector.cancel_if_owned_by(warehouse) {
            debug!(warehouse = %warehouse, "selection cancelled, no farmers left");
        }
        info!(warehouse = %warehouse, role = role.as_str(), count, "roster updated");
        CommandOutcome::applied(Some(MessageKey::RosterUpdated))
    }

    /// The warehouse a hotkey at `tile` refers to.
    ///
    /// The warehouse building under the tile wins. Otherwise the nearest one
    /// with farmers, then, unless `require_farmer`, the nearest one at all.
    pub fn pick_warehouse<R: BuildingRegistry>(
        &self,
        tile: Tile,
        require_farmer: bool,
        registry: &R,
    ) -> Option<WarehouseId> {
        if let Some(id) = registry
            .building_at(tile)
            .and_then(|fp| fp.warehouse)
            .filter(|id| self.warehouses.contains_key(id))
        {
            return Some(id);
        }
        let from = tile.center();
        let nearest = |farmers_only: bool| {
            self.warehouses
                .values()
                .filter(|w| !farmers_only || w.roster.farmer_count() > 0)
                .min_by(|a, b| {
                    from.distance(a.hatch())
                        .total_cmp(&from.distance(b.hatch()))
                        .then_with(|| a.id.cmp(&b.id))
                })
                .map(Warehouse::id)
        };
        nearest(true).or_else(|| if require_farmer { None } else { nearest(false) })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Whether a selection session is live.
    pub const fn is_selection_active(&self) -> bool {
        self.selector.is_active()
    }

    /// Current beacon size of the live session.
    pub fn current_selection_size(&self) -> Option<u32> {
        self.selector.session().map(crate::selection::SelectionSession::size)
    }

    /// Warehouse owning the live session.
    pub fn selection_owner(&self) -> Option<WarehouseId> {
        self.selector.owner()
    }

    /// Squares of every placed beacon.
    pub fn beacon_preview_squares(&self) -> Vec<TileRect> {
        self.selector.preview_squares()
    }

    /// The square a beacon at `tile` would cover.
    pub fn hover_preview(&self, tile: Tile) -> Option<TileRect> {
        self.selector.hover_preview(tile)
    }

    /// Current size as `"NxN"`.
    pub fn current_size_text(&self) -> Option<String> {
        self.selector.size_text()
    }

    /// Snapshots of a warehouse's agents.
    pub fn agent_views(&self, warehouse: WarehouseId) -> Vec<AgentView> {
        self.warehouses
            .get(&warehouse)
            .map(|wh| wh.agents.iter().map(Agent::view).collect())
            .unwrap_or_default()
    }

    /// Whether a warehouse's lid is open.
    pub fn lid_open(&self, warehouse: WarehouseId) -> bool {
        self.warehouses
            .get(&warehouse)
            .is_some_and(Warehouse::lid_open)
    }

    /// Whether any lid is open.
    pub fn any_lid_open(&self) -> bool {
        self.warehouses.values().any(Warehouse::lid_open)
    }

    /// Overlay rows for a warehouse's farmer queue.
    pub fn farmer_queue(&self, warehouse: WarehouseId) -> Vec<JobView> {
        self.warehouses
            .get(&warehouse)
            .map(|wh| wh.jobs.views())
            .unwrap_or_default()
    }

    /// A warehouse.
    pub fn warehouse(&self, id: WarehouseId) -> Option<&Warehouse> {
        self.warehouses.get(&id)
    }

    /// Every warehouse, ordered by id.
    pub fn warehouses(&self) -> impl Iterator<Item = &Warehouse> {
        self.warehouses.values()
    }

    /// The charge ledger.
    pub const fn ledger(&self) -> &ChargeLedger {
        &self.ledger
    }

    /// Contents of a warehouse chest.
    pub fn chest_contents(&self, warehouse: WarehouseId) -> &[ItemStack] {
        self.warehouses
            .get(&warehouse)
            .map_or(&[], |wh| wh.chest.contents())
    }

    /// Every target held by an agent right now.
    pub fn held_targets(&self) -> Vec<(AgentId, TargetRef)> {
        self.warehouses
            .values()
            .flat_map(|wh| wh.agents.iter())
            .filter_map(|a| a.target().map(|t| (a.id(), t)))
            .collect()
    }

    /// The dry list as of the last rebuild.
    pub const fn dry_list(&self) -> &DryList {
        &self.dry_list
    }
}

// ---------------------------------------------------------------------------
// Per-warehouse steps
// ---------------------------------------------------------------------------

fn profile_for(config: &DroneConfig, role: Role) -> RoleProfile {
    RoleProfile::for_role(role, config.timing(role), config.refills_at_hatch(role))
}

fn log_transition(agent: AgentId, result: Result<(), AgentError>) {
    if let Err(err) = result {
        warn!(%agent, error = %err, "agent transition refused");
    }
}

fn log_outcome(command: &'static str, outcome: CommandOutcome) {
    if let Some(message) = outcome.message.filter(|m| m.is_error()) {
        debug!(command, message = message.key(), "command rejected");
    }
}

/// Drop jobs beyond the farmer count, newest first.
fn enforce_job_limit(wh: &mut Warehouse) {
    let limit = usize::try_from(wh.roster.farmer_count()).unwrap_or(usize::MAX);
    let dropped = wh.jobs.truncate(limit);
    if !dropped.is_empty() {
        info!(warehouse = %wh.id, dropped = dropped.len(), "farmer jobs dropped with their farmers");
    }
}

/// Refund and unload retired agents.
fn stow_retired(ledger: &mut ChargeLedger, wh: &mut Warehouse, retired: Vec<Agent>) {
    for mut agent in retired {
        if let Some(kind) = agent.take_reservation() {
            ledger.refill(wh.id, kind, 1);
        }
        let payload = agent.unload();
        if !payload.is_empty() {
            ledger.refill(wh.id, ResourceKind::Cargo, 1);
            wh.stash_items(payload);
        }
    }
}

fn step_warehouse(wh: &mut Warehouse, dt: f64, env: &mut Env<'_>, world: &mut dyn FarmWorld) {
    for agent in &mut wh.agents {
        step_agent(agent, dt, &mut wh.jobs, &mut wh.chest, env, world);
    }
}

fn step_agent(
    agent: &mut Agent,
    dt: f64,
    jobs: &mut FarmerQueue,
    chest: &mut Chest,
    env: &mut Env<'_>,
    world: &mut dyn FarmWorld,
) {
    let home = agent.home();
    // Clear and Fail follow a resolved rip; the debris is gone or stays.
    let resolved = matches!(agent.work(), Some(WorkPhase::Clear | WorkPhase::Fail));
    if let Some(target) = agent.target()
        && !resolved
    {
        if !targeting::is_still_valid(target, world) {
            abort(home, agent, target, jobs, env);
            return;
        }
        if let TargetRef::Animal(id) = target
            && let Some(tile) = world.animal_tile(id)
        {
            agent.set_destination(tile.center());
        }
    }

    let profile = profile_for(env.config, agent.role());
    let Some(event) = agent.advance(dt, &profile) else {
        return;
    };
    trace!(agent = %agent.id(), ?event, "agent step");
    match event {
        StepEvent::Launched | StepEvent::ReachedHome => {}
        StepEvent::Arrived => {
            if let Some(job) = agent.job().and_then(|id| jobs.get_mut(id)) {
                job.set_phase(JobPhase::Working);
            }
        }
        StepEvent::WorkFinished(work) => finish_work(home, agent, work, jobs, env, world),
        StepEvent::Landed => land(home, agent, &profile, chest, env),
        StepEvent::Refilled => {
            if let Some(kind) = profile.consumes {
                let added = env.ledger.refill_full(home, kind);
                debug!(warehouse = %home, ?kind, added, "refilled at hatch");
            }
        }
    }
}

/// The target went away: refund, give the tile up and fly home.
fn abort(
    home: WarehouseId,
    agent: &mut Agent,
    target: TargetRef,
    jobs: &mut FarmerQueue,
    env: &mut Env<'_>,
) {
    if let Some(kind) = agent.take_reservation() {
        env.ledger.refill(home, kind, 1);
    }
    if let TargetRef::Debris(tile) = target {
        if let Some(job) = agent.job().and_then(|id| jobs.get_mut(id)) {
            job.drop_tile(tile);
        }
        jobs.release_agent(agent.id());
    }
    env.claims.release(&target);
    log_transition(agent.id(), agent.fly_home());
    env.summary.aborted = env.summary.aborted.saturating_add(1);
    debug!(warehouse = %home, agent = %agent.id(), ?target, "target invalidated, returning home");
}

fn refund(home: WarehouseId, agent: &mut Agent, env: &mut Env<'_>) {
    if let Some(kind) = agent.take_reservation() {
        env.ledger.refill(home, kind, 1);
    }
}

fn finish_work(
    home: WarehouseId,
    agent: &mut Agent,
    work: WorkPhase,
    jobs: &mut FarmerQueue,
    env: &mut Env<'_>,
    world: &mut dyn FarmWorld,
) {
    let Some(target) = agent.target() else {
        log_transition(agent.id(), agent.fly_home());
        return;
    };
    let completed = match (work, target) {
        (WorkPhase::Harvest, TargetRef::Crop(tile)) => {
            match world.harvest(tile) {
                Some(items) if !items.is_empty() => {
                    agent.settle();
                    agent.load(items);
                }
                _ => refund(home, agent, env),
            }
            log_transition(agent.id(), agent.fly_home());
            true
        }
        (WorkPhase::Water, TargetRef::DryTile(tile)) => {
            if world.water(tile) {
                agent.settle();
            } else {
                refund(home, agent, env);
            }
            env.dry_list.mark_watered(tile);
            log_transition(agent.id(), agent.fly_home());
            true
        }
        (WorkPhase::Groom, TargetRef::Animal(id)) => {
            if world.groom(id) {
                agent.settle();
                env.ledger.reservations_mut().reserve(id);
            } else {
                refund(home, agent, env);
            }
            log_transition(agent.id(), agent.fly_home());
            true
        }
        (WorkPhase::Rip, TargetRef::Debris(tile)) => {
            let next = match world.clear(tile) {
                ClearOutcome::Cleared => Some(WorkPhase::Clear),
                ClearOutcome::Failed => Some(WorkPhase::Fail),
                ClearOutcome::Gone => None,
            };
            let job = agent.job().and_then(|id| jobs.get_mut(id));
            match (next, job) {
                (Some(work), Some(job)) => {
                    job.set_phase(JobPhase::from_work(work));
                    log_transition(agent.id(), agent.continue_work(work));
                }
                (Some(work), None) => log_transition(agent.id(), agent.continue_work(work)),
                (None, job) => {
                    if let Some(job) = job {
                        job.drop_tile(tile);
                    }
                    next_zone_tile(home, agent, jobs, env, world);
                }
            }
            false
        }
        (WorkPhase::Clear | WorkPhase::Fail, TargetRef::Debris(tile)) => {
            if let Some(job) = agent.job().and_then(|id| jobs.get_mut(id)) {
                if work == WorkPhase::Clear {
                    job.record_cleared(tile);
                } else {
                    job.record_failed(tile);
                }
            }
            next_zone_tile(home, agent, jobs, env, world);
            true
        }
        _ => {
            warn!(agent = %agent.id(), ?work, ?target, "work does not match target");
            refund(home, agent, env);
            log_transition(agent.id(), agent.fly_home());
            false
        }
    };
    if completed {
        env.summary.completed = env.summary.completed.saturating_add(1);
    }
}

/// Move a farmer on to the nearest remaining tile of its job, or home.
fn next_zone_tile(
    home: WarehouseId,
    agent: &mut Agent,
    jobs: &mut FarmerQueue,
    env: &mut Env<'_>,
    world: &dyn FarmWorld,
) {
    let Some(job) = agent.job().and_then(|id| jobs.get_mut(id)) else {
        log_transition(agent.id(), agent.fly_home());
        return;
    };
    let next = targeting::find_debris(
        home,
        agent.position(),
        job.remaining(),
        world,
        env.no_fly,
        env.claims,
    );
    match next {
        Some((target, tile)) if env.claims.try_claim(target) => {
            job.set_phase(JobPhase::Working);
            log_transition(agent.id(), agent.retarget(target, tile.center()));
        }
        _ => {
            job.release(agent.id());
            if job.phase() == JobPhase::Done {
                info!(
                    warehouse = %home,
                    job = %job.id(),
                    cleared = job.cleared(),
                    failed = job.failed(),
                    "farmer job finished"
                );
            }
            log_transition(agent.id(), agent.fly_home());
        }
    }
}

fn land(
    home: WarehouseId,
    agent: &mut Agent,
    profile: &RoleProfile,
    chest: &mut Chest,
    env: &mut Env<'_>,
) {
    refund(home, agent, env);
    deposit_payload(home, agent, chest, env.ledger);
    env.summary.landed = env.summary.landed.saturating_add(1);
    if let Some(kind) = profile.consumes
        && profile.refill_at_hatch
        && env.ledger.balance(home, kind) == Some(0)
    {
        log_transition(agent.id(), agent.begin_refill());
    }
}

/// Put an agent's payload into the chest. Whatever does not fit stays with
/// the agent for the next try; the cargo slot comes back once all of it is
/// in.
fn deposit_payload(home: WarehouseId, agent: &mut Agent, chest: &mut Chest, ledger: &mut ChargeLedger) {
    let payload = agent.unload();
    if payload.is_empty() {
        return;
    }
    let left = chest.deposit_all(payload);
    if left.is_empty() {
        ledger.refill(home, ResourceKind::Cargo, 1);
    } else {
        debug!(warehouse = %home, agent = %agent.id(), stacks = left.len(), "chest full, keeping load");
        agent.load(left);
    }
}

fn scan_warehouse(wh: &mut Warehouse, env: &mut Env<'_>, world: &dyn FarmWorld) {
    let moved = wh.flush_stash();
    if moved > 0 {
        debug!(warehouse = %wh.id, stacks = moved, "stash moved into chest");
    }
    let home = wh.id;
    let origin = wh.hatch();
    for agent in &mut wh.agents {
        if !agent.is_idle() {
            continue;
        }
        if !agent.payload().is_empty() {
            deposit_payload(home, agent, &mut wh.chest, env.ledger);
            if !agent.payload().is_empty() {
                continue;
            }
        }
        let profile = profile_for(env.config, agent.role());
        if let Some(kind) = profile.consumes
            && env.ledger.balance(home, kind).unwrap_or(0) == 0
        {
            if profile.refill_at_hatch {
                log_transition(agent.id(), agent.begin_refill());
            }
            continue;
        }
        if agent.role().is_farmer() {
            assign_farmer(home, origin, agent, &mut wh.jobs, env, world);
        } else {
            launch_drone(home, origin, agent, &profile, env, world);
        }
    }
}

fn launch_drone(
    home: WarehouseId,
    origin: Position,
    agent: &mut Agent,
    profile: &RoleProfile,
    env: &mut Env<'_>,
    world: &dyn FarmWorld,
) {
    let ctx = SearchContext {
        home,
        origin,
        no_fly: env.no_fly,
        los_pad: env.config.general.line_of_sight_pad_tiles(),
        claims: env.claims,
    };
    let found = match agent.role() {
        Role::Harvester => targeting::find_harvest(&ctx, world, &env.config.harvester),
        Role::Waterer => targeting::find_dry_tile(&ctx, world, env.dry_list),
        Role::Petter => targeting::find_animal(&ctx, world, env.ledger.reservations()),
        Role::Farmer => None,
    };
    let Some((target, tile)) = found else {
        return;
    };
    if !env.claims.try_claim(target) {
        return;
    }
    let reserved = match profile.consumes {
        Some(kind) if env.ledger.try_consume(home, kind, 1) => Some(kind),
        Some(_) => {
            env.claims.release(&target);
            return;
        }
        None => None,
    };
    match agent.launch(target, tile.center(), None, reserved) {
        Ok(()) => {
            env.summary.launched = env.summary.launched.saturating_add(1);
            trace!(warehouse = %home, agent = %agent.id(), ?target, "drone launched");
        }
        Err(err) => {
            if let Some(kind) = reserved {
                env.ledger.refill(home, kind, 1);
            }
            env.claims.release(&target);
            warn!(agent = %agent.id(), error = %err, "launch refused");
        }
    }
}

/// Bind an idle farmer to the first job that takes it.
fn assign_farmer(
    home: WarehouseId,
    origin: Position,
    agent: &mut Agent,
    jobs: &mut FarmerQueue,
    env: &mut Env<'_>,
    world: &dyn FarmWorld,
) {
    let batch = env.config.farmer.batch_size;
    for job in jobs.iter_mut() {
        let unclaimed = job
            .remaining()
            .iter()
            .filter(|t| !env.claims.is_claimed(&TargetRef::Debris(**t)))
            .count();
        if !job.accepts_farmer(unclaimed, batch) {
            continue;
        }
        let Some((target, tile)) =
            targeting::find_debris(home, origin, job.remaining(), world, env.no_fly, env.claims)
        else {
            continue;
        };
        if !env.claims.try_claim(target) {
            continue;
        }
        match agent.launch(target, tile.center(), Some(job.id()), None) {
            Ok(()) => {
                job.assign(agent.id());
                env.summary.launched = env.summary.launched.saturating_add(1);
                debug!(warehouse = %home, agent = %agent.id(), job = %job.id(), "farmer assigned");
            }
            Err(err) => {
                env.claims.release(&target);
                warn!(agent = %agent.id(), error = %err, "farmer launch refused");
            }
        }
        return;
    }
}
