//! Typed warehouse records stored in the host's per-building metadata.
//!
//! Agents are never persisted. A save writes, per warehouse, the roster, the
//! ledger balances, the chest (with the stash and whatever agents were
//! carrying) and the farmer job list. Every value is JSON under a fixed key.
//!
//! Decoding never fails: a missing or malformed value falls back to its
//! default with a warning, and a schema mismatch discards the whole record.
//!
//! # Keys
//!
//! | Key | Value |
//! |-----|-------|
//! | `dronehouse.schema` | Record schema version |
//! | `dronehouse.farmer-count` | Farmer workers, `0..=3` |
//! | `dronehouse.has-farmer` | `"1"` or `"0"`, read when no count is stored |
//! | `dronehouse.roster` | Agents per role |
//! | `dronehouse.ledger` | Balance per resource kind |
//! | `dronehouse.chest` | Chest stacks and stash |
//! | `dronehouse.farmer-jobs` | Job geometry, progress and phase |

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use dronehouse_types::{ItemStack, JobId, JobPhase, ResourceKind, Tile, WarehouseId};
use dronehouse_world::WorldError;

use crate::config::FleetConfig;
use crate::jobs::FarmerJob;
use crate::warehouse::Roster;
use crate::zone::Beacon;

/// Current record schema.
pub const SCHEMA_VERSION: &str = "1";

/// Metadata keys.
pub mod keys {
    /// Record schema version.
    pub const SCHEMA: &str = "dronehouse.schema";
    /// Farmer worker count.
    pub const FARMER_COUNT: &str = "dronehouse.farmer-count";
    /// Legacy farmer flag.
    pub const HAS_FARMER: &str = "dronehouse.has-farmer";
    /// Agents per role.
    pub const ROSTER: &str = "dronehouse.roster";
    /// Ledger balances.
    pub const LEDGER: &str = "dronehouse.ledger";
    /// Chest and stash.
    pub const CHEST: &str = "dronehouse.chest";
    /// Farmer jobs.
    pub const FARMER_JOBS: &str = "dronehouse.farmer-jobs";
}

/// Errors raised while saving.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// A record could not be serialised.
    #[error("failed to encode warehouse record: {0}")]
    Json(#[from] serde_json::Error),

    /// The host refused a metadata write.
    #[error("failed to write warehouse metadata: {0}")]
    Host(#[from] WorldError),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Chest contents plus items waiting for space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestRecord {
    /// Chest stacks in slot order.
    pub stacks: Vec<ItemStack>,
    /// Items the chest could not take.
    #[serde(default)]
    pub stash: Vec<ItemStack>,
}

/// One farmer job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identity.
    pub id: JobId,
    /// Owning warehouse.
    pub warehouse: WarehouseId,
    /// Zone beacons in placement order.
    pub beacons: Vec<Beacon>,
    /// Tiles still to clear.
    pub remaining: Vec<Tile>,
    /// Tiles at commit.
    pub total: u32,
    /// Tiles cleared.
    pub cleared: u32,
    /// Tiles given up on.
    pub failed: u32,
    /// Progress phase.
    pub phase: JobPhase,
    /// Seconds in the phase.
    pub elapsed: f64,
}

impl From<&FarmerJob> for JobRecord {
    fn from(job: &FarmerJob) -> Self {
        Self {
            id: job.id,
            warehouse: job.warehouse,
            beacons: job.beacons.clone(),
            remaining: job.remaining.iter().copied().collect(),
            total: job.total,
            cleared: job.cleared,
            failed: job.failed,
            phase: job.phase,
            elapsed: job.elapsed,
        }
    }
}

impl JobRecord {
    /// Rebuild the job. Nobody is assigned after a load.
    pub fn into_job(self) -> FarmerJob {
        FarmerJob {
            id: self.id,
            warehouse: self.warehouse,
            beacons: self.beacons,
            remaining: self.remaining.into_iter().collect(),
            total: self.total,
            cleared: self.cleared,
            failed: self.failed,
            phase: self.phase,
            elapsed: self.elapsed,
            assigned: BTreeSet::new(),
        }
    }
}

/// Everything persisted for one warehouse.
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseRecord {
    /// Agents per role, farmer count included.
    pub roster: Roster,
    /// Ledger balances.
    pub ledger: BTreeMap<ResourceKind, u32>,
    /// Chest and stash.
    pub chest: ChestRecord,
    /// Farmer jobs in priority order.
    pub jobs: Vec<JobRecord>,
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

/// Encode a record as metadata key/value pairs.
pub fn encode(record: &WarehouseRecord) -> Result<BTreeMap<String, String>, PersistError> {
    let farmers = record.roster.farmer_count();
    let mut out = BTreeMap::new();
    out.insert(keys::SCHEMA.to_owned(), SCHEMA_VERSION.to_owned());
    out.insert(keys::FARMER_COUNT.to_owned(), farmers.to_string());
    out.insert(
        keys::HAS_FARMER.to_owned(),
        if farmers > 0 { "1" } else { "0" }.to_owned(),
    );
    out.insert(keys::ROSTER.to_owned(), serde_json::to_string(&record.roster)?);
    out.insert(keys::LEDGER.to_owned(), serde_json::to_string(&record.ledger)?);
    out.insert(keys::CHEST.to_owned(), serde_json::to_string(&record.chest)?);
    out.insert(keys::FARMER_JOBS.to_owned(), serde_json::to_string(&record.jobs)?);
    Ok(out)
}

/// Decode the record stored on `warehouse`.
///
/// Returns `None` when nothing was ever saved there or the schema does not
/// match, in which case the warehouse starts from defaults.
pub fn decode(
    warehouse: WarehouseId,
    metadata: &BTreeMap<String, String>,
    fleet: &FleetConfig,
) -> Option<WarehouseRecord> {
    if !metadata.keys().any(|k| k.starts_with("dronehouse.")) {
        return None;
    }
    match metadata.get(keys::SCHEMA).map(String::as_str) {
        Some(SCHEMA_VERSION) => {}
        // Only the legacy farmer keys were ever written.
        None if !metadata.contains_key(keys::ROSTER) => {}
        other => {
            warn!(warehouse = %warehouse, schema = ?other, "unknown record schema, using defaults");
            return None;
        }
    }

    let mut roster: Roster =
        read(warehouse, metadata, keys::ROSTER).unwrap_or_else(|| Roster::from_fleet(fleet));
    let farmers = farmer_count(warehouse, metadata).unwrap_or_else(|| roster.farmer_count());
    roster.set(dronehouse_types::Role::Farmer, farmers);
    let roster = roster.clamped(fleet);

    let ledger = read(warehouse, metadata, keys::LEDGER).unwrap_or_default();
    let chest = read(warehouse, metadata, keys::CHEST).unwrap_or_default();

    let mut jobs: Vec<JobRecord> =
        read(warehouse, metadata, keys::FARMER_JOBS).unwrap_or_default();
    let before = jobs.len();
    jobs.retain(|job| job.warehouse == warehouse);
    if jobs.len() != before {
        warn!(
            warehouse = %warehouse,
            dropped = before.saturating_sub(jobs.len()),
            "dropped farmer jobs saved for another warehouse"
        );
    }
    let limit = usize::try_from(roster.farmer_count()).unwrap_or(usize::MAX);
    if jobs.len() > limit {
        warn!(
            warehouse = %warehouse,
            dropped = jobs.len().saturating_sub(limit),
            "dropped farmer jobs beyond the farmer count"
        );
        jobs.truncate(limit);
    }

    Some(WarehouseRecord {
        roster,
        ledger,
        chest,
        jobs,
    })
}

fn farmer_count(warehouse: WarehouseId, metadata: &BTreeMap<String, String>) -> Option<u32> {
    if let Some(raw) = metadata.get(keys::FARMER_COUNT) {
        match raw.trim().parse::<u32>() {
            Ok(count) => return Some(count),
            Err(err) => warn!(warehouse = %warehouse, value = %raw, error = %err, "bad farmer count"),
        }
    }
    metadata
        .get(keys::HAS_FARMER)
        .map(|flag| u32::from(flag.trim() == "1"))
}

fn read<T: DeserializeOwned>(
    warehouse: WarehouseId,
    metadata: &BTreeMap<String, String>,
    key: &str,
) -> Option<T> {
    let raw = metadata.get(key)?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(warehouse = %warehouse, key, error = %err, "unreadable metadata, using default");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dronehouse_types::Role;

    fn job(warehouse: WarehouseId, phase: JobPhase) -> JobRecord {
        JobRecord {
            id: JobId::new(),
            warehouse,
            beacons: vec![Beacon::new(Tile::new(4, 4), 3), Beacon::new(Tile::new(6, 5), 5)],
            remaining: vec![Tile::new(4, 4), Tile::new(7, 6)],
            total: 9,
            cleared: 6,
            failed: 1,
            phase,
            elapsed: 1.25,
        }
    }

    fn record(warehouse: WarehouseId) -> WarehouseRecord {
        WarehouseRecord {
            roster: Roster::uniform(2, 2),
            ledger: BTreeMap::from([
                (ResourceKind::Cargo, 3),
                (ResourceKind::Water, 17),
                (ResourceKind::PetCharge, 9),
            ]),
            chest: ChestRecord {
                stacks: vec![ItemStack::new("(O)24", 12)],
                stash: vec![ItemStack::new("(O)16", 1)],
            },
            jobs: vec![job(warehouse, JobPhase::Clearing), job(warehouse, JobPhase::Queued)],
        }
    }

    #[test]
    fn round_trip_is_lossless() {
        let id = WarehouseId::new();
        let original = record(id);
        let encoded = encode(&original).unwrap();
        let decoded = decode(id, &encoded, &FleetConfig::default()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(encode(&decoded).unwrap(), encoded);
    }

    #[test]
    fn accumulated_tick_time_survives_a_reload() {
        let id = WarehouseId::new();
        let mut original = record(id);
        let mut elapsed = 0.0_f64;
        for tick in 0..20_000_u32 {
            elapsed += 1.0 / 60.0;
            let text = serde_json::to_string(&elapsed).unwrap();
            let back: f64 = serde_json::from_str(&text).unwrap();
            assert_eq!(back.to_bits(), elapsed.to_bits(), "tick {tick}: {text}");
        }
        original.jobs[0].elapsed = elapsed;
        let decoded = decode(id, &encode(&original).unwrap(), &FleetConfig::default()).unwrap();
        assert_eq!(decoded.jobs[0].elapsed.to_bits(), elapsed.to_bits());
    }

    #[test]
    fn nothing_saved_means_no_record() {
        let meta = BTreeMap::from([("other.mod".to_owned(), "x".to_owned())]);
        assert!(decode(WarehouseId::new(), &meta, &FleetConfig::default()).is_none());
    }

    #[test]
    fn legacy_has_farmer_flag_gives_one_farmer() {
        let meta = BTreeMap::from([(keys::HAS_FARMER.to_owned(), "1".to_owned())]);
        let decoded = decode(WarehouseId::new(), &meta, &FleetConfig::default()).unwrap();
        assert_eq!(decoded.roster.farmer_count(), 1);
        assert_eq!(decoded.roster.get(Role::Harvester), 1);
        assert!(decoded.jobs.is_empty());
    }

    #[test]
    fn schema_mismatch_discards_everything() {
        let id = WarehouseId::new();
        let mut meta = encode(&record(id)).unwrap();
        meta.insert(keys::SCHEMA.to_owned(), "99".to_owned());
        assert!(decode(id, &meta, &FleetConfig::default()).is_none());
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let id = WarehouseId::new();
        let mut meta = encode(&record(id)).unwrap();
        meta.insert(keys::LEDGER.to_owned(), "{not json".to_owned());
        meta.insert(keys::FARMER_COUNT.to_owned(), "many".to_owned());
        let decoded = decode(id, &meta, &FleetConfig::default()).unwrap();
        assert!(decoded.ledger.is_empty());
        // Falls back to the legacy flag, which says there are farmers.
        assert_eq!(decoded.roster.farmer_count(), 1);
        assert_eq!(decoded.jobs.len(), 1);
    }

    #[test]
    fn foreign_and_excess_jobs_are_dropped() {
        let id = WarehouseId::new();
        let mut original = record(id);
        original.jobs.insert(0, job(WarehouseId::new(), JobPhase::Working));
        original.roster.set(Role::Farmer, 1);
        let decoded = decode(id, &encode(&original).unwrap(), &FleetConfig::default()).unwrap();
        assert_eq!(decoded.jobs.len(), 1);
        assert_eq!(decoded.jobs[0].phase, JobPhase::Clearing);
    }

    #[test]
    fn farmer_count_is_clamped() {
        let id = WarehouseId::new();
        let mut meta = encode(&record(id)).unwrap();
        meta.insert(keys::FARMER_COUNT.to_owned(), "7".to_owned());
        let decoded = decode(id, &meta, &FleetConfig::default()).unwrap();
        assert_eq!(decoded.roster.farmer_count(), 3);
    }
}
