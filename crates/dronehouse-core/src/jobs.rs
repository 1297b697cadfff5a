//! The per-warehouse farmer job queue.
//!
//! Jobs are kept in insertion order, which is also assignment priority.
//! A job is worked by one farmer at a time unless its unclaimed work
//! exceeds the batch size per assigned farmer, in which case another idle
//! farmer may join. Jobs with no work left become `Done` and are pruned by
//! the periodic trim pass. Tiles that sit inside another building's no-fly
//! zone can never be worked; trim gives them up.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use dronehouse_types::{AgentId, JobId, JobPhase, Tile, WarehouseId};
use dronehouse_world::{FarmWorld, NoFlyList};

use crate::zone::{Beacon, zone_tiles};

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One committed zone-clearing assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct FarmerJob {
    pub(crate) id: JobId,
    pub(crate) warehouse: WarehouseId,
    pub(crate) beacons: Vec<Beacon>,
    pub(crate) remaining: BTreeSet<Tile>,
    pub(crate) total: u32,
    pub(crate) cleared: u32,
    pub(crate) failed: u32,
    pub(crate) phase: JobPhase,
    pub(crate) elapsed: f64,
    pub(crate) assigned: BTreeSet<AgentId>,
}

/// What the queue overlay shows for a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    /// Job identity.
    pub id: JobId,
    /// Progress phase.
    pub phase: JobPhase,
    /// Seconds a farmer has spent on the job in the current phase.
    pub elapsed: f64,
    /// Tiles that needed clearing at commit.
    pub total: u32,
    /// Tiles cleared so far.
    pub cleared: u32,
    /// Tiles given up on.
    pub failed: u32,
    /// Tiles still to do.
    pub remaining: u32,
    /// Farmers currently on the job.
    pub assigned: u32,
}

impl FarmerJob {
    /// A queued job over the beacons' zone, keeping only tiles that
    /// currently hold clearable debris.
    pub fn new(warehouse: WarehouseId, beacons: Vec<Beacon>, world: &dyn FarmWorld) -> Self {
        let remaining: BTreeSet<Tile> = zone_tiles(&beacons)
            .into_iter()
            .filter(|t| world.in_bounds(*t) && world.clearable_at(*t))
            .collect();
        let total = u32::try_from(remaining.len()).unwrap_or(u32::MAX);
        Self {
            id: JobId::new(),
            warehouse,
            beacons,
            remaining,
            total,
            cleared: 0,
            failed: 0,
            phase: JobPhase::Queued,
            elapsed: 0.0,
            assigned: BTreeSet::new(),
        }
    }

    /// Job identity.
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Owning warehouse.
    pub const fn warehouse(&self) -> WarehouseId {
        self.warehouse
    }

    /// Beacons defining the zone.
    pub fn beacons(&self) -> &[Beacon] {
        &self.beacons
    }

    /// Progress phase.
    pub const fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Tiles still to clear.
    pub const fn remaining(&self) -> &BTreeSet<Tile> {
        &self.remaining
    }

    /// Farmers on the job.
    pub const fn assigned(&self) -> &BTreeSet<AgentId> {
        &self.assigned
    }

    /// Tiles cleared so far.
    pub const fn cleared(&self) -> u32 {
        self.cleared
    }

    /// Tiles given up on.
    pub const fn failed(&self) -> u32 {
        self.failed
    }

    /// Move to `phase`, restarting the phase timer on change.
    pub fn set_phase(&mut self, phase: JobPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.elapsed = 0.0;
        }
    }

    /// Advance the phase timer. Only runs while a farmer is on the job.
    pub fn advance(&mut self, dt: f64) {
        if !self.phase.is_terminal() && !self.assigned.is_empty() {
            self.elapsed += dt;
        }
    }

    /// Whether another farmer may be bound to this job.
    ///
    /// `unclaimed` is the number of remaining tiles no farmer holds.
    pub fn accepts_farmer(&self, unclaimed: usize, batch_size: u32) -> bool {
        if self.phase.is_terminal() || unclaimed == 0 {
            return false;
        }
        let batch = usize::try_from(batch_size).unwrap_or(usize::MAX);
        self.assigned.is_empty() || unclaimed > batch.saturating_mul(self.assigned.len())
    }

    /// Bind a farmer.
    pub fn assign(&mut self, agent: AgentId) {
        self.assigned.insert(agent);
        if self.phase == JobPhase::Queued {
            self.set_phase(JobPhase::Working);
        }
    }

    /// Unbind a farmer. An unworked job with work left goes back to the queue.
    pub fn release(&mut self, agent: AgentId) {
        self.assigned.remove(&agent);
        if self.assigned.is_empty() && !self.phase.is_terminal() {
            if self.remaining.is_empty() {
                self.set_phase(JobPhase::Done);
            } else {
                self.set_phase(JobPhase::Queued);
            }
        }
    }

    /// Record a cleared tile.
    pub fn record_cleared(&mut self, tile: Tile) {
        if self.remaining.remove(&tile) {
            self.cleared = self.cleared.saturating_add(1);
        }
    }

    /// Record a tile the farmer could not clear.
    pub fn record_failed(&mut self, tile: Tile) {
        if self.remaining.remove(&tile) {
            self.failed = self.failed.saturating_add(1);
        }
    }

    /// Forget a tile that no longer needs clearing.
    pub fn drop_tile(&mut self, tile: Tile) {
        self.remaining.remove(&tile);
    }

    /// Drop tiles that no longer hold clearable debris, keeping `held`
    /// (tiles a farmer is working on right now). Tiles inside a foreign
    /// no-fly zone are given up and counted as failed. Marks the job done
    /// when nothing is left and nobody works on it.
    pub fn revalidate(
        &mut self,
        world: &dyn FarmWorld,
        no_fly: &NoFlyList,
        held: &BTreeSet<Tile>,
    ) -> usize {
        let before = self.remaining.len();
        let home = self.warehouse;
        let mut blocked = 0_u32;
        self.remaining.retain(|t| {
            if held.contains(t) {
                return true;
            }
            if !world.in_bounds(*t) || !world.clearable_at(*t) {
                return false;
            }
            if no_fly.blocks_tile(home, *t) {
                blocked = blocked.saturating_add(1);
                return false;
            }
            true
        });
        if blocked > 0 {
            self.failed = self.failed.saturating_add(blocked);
            debug!(job = %self.id, blocked, "zone tiles under a building given up");
        }
        if self.remaining.is_empty() && self.assigned.is_empty() {
            self.set_phase(JobPhase::Done);
        }
        before.saturating_sub(self.remaining.len())
    }

    /// Overlay snapshot.
    pub fn view(&self) -> JobView {
        JobView {
            id: self.id,
            phase: self.phase,
            elapsed: self.elapsed,
            total: self.total,
            cleared: self.cleared,
            failed: self.failed,
            remaining: u32::try_from(self.remaining.len()).unwrap_or(u32::MAX),
            assigned: u32::try_from(self.assigned.len()).unwrap_or(u32::MAX),
        }
    }
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// Result of a trim pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimReport {
    /// Done jobs removed.
    pub pruned: usize,
    /// Tiles dropped from live jobs.
    pub dropped_tiles: usize,
}

/// Ordered farmer jobs of one warehouse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FarmerQueue {
    jobs: Vec<FarmerJob>,
}

impl FarmerQueue {
    /// An empty queue.
    pub const fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// Append a job.
    pub fn push(&mut self, job: FarmerJob) {
        self.jobs.push(job);
    }

    /// Number of jobs, including done ones not yet pruned.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs that still count against the farmer limit.
    pub fn active_count(&self) -> usize {
        self.jobs.iter().filter(|j| !j.phase.is_terminal()).count()
    }

    /// Jobs in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &FarmerJob> {
        self.jobs.iter()
    }

    /// Mutable jobs in priority order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FarmerJob> {
        self.jobs.iter_mut()
    }

    /// Look up a job.
    pub fn get(&self, id: JobId) -> Option<&FarmerJob> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Look up a job mutably.
    pub fn get_mut(&mut self, id: JobId) -> Option<&mut FarmerJob> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    /// Unbind a farmer from whatever job it works on.
    pub fn release_agent(&mut self, agent: AgentId) {
        for job in &mut self.jobs {
            if job.assigned.contains(&agent) {
                job.release(agent);
            }
        }
    }

    /// Unbind every farmer (day reset, load).
    pub fn release_all(&mut self) {
        for job in &mut self.jobs {
            let agents: Vec<AgentId> = job.assigned.iter().copied().collect();
            for agent in agents {
                job.release(agent);
            }
        }
    }

    /// Revalidate live jobs against the world and prune done ones.
    pub fn trim(
        &mut self,
        world: &dyn FarmWorld,
        no_fly: &NoFlyList,
        held: &BTreeSet<Tile>,
    ) -> TrimReport {
        let dropped_tiles = self
            .jobs
            .iter_mut()
            .filter(|j| !j.phase.is_terminal())
            .map(|j| j.revalidate(world, no_fly, held))
            .sum();
        let before = self.jobs.len();
        self.jobs.retain(|j| !j.phase.is_terminal());
        let pruned = before.saturating_sub(self.jobs.len());
        if pruned > 0 || dropped_tiles > 0 {
            debug!(pruned, dropped_tiles, "farmer queue trimmed");
        }
        TrimReport {
            pruned,
            dropped_tiles,
        }
    }

    /// Keep at most `max` jobs, dropping from the back. Returns the dropped
    /// jobs.
    pub fn truncate(&mut self, max: usize) -> Vec<FarmerJob> {
        if self.jobs.len() <= max {
            return Vec::new();
        }
        self.jobs.split_off(max)
    }

    /// Overlay snapshot of every job.
    pub fn views(&self) -> Vec<JobView> {
        self.jobs.iter().map(FarmerJob::view).collect()
    }
}
