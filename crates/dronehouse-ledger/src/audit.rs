//! Ledger integrity checks.
//!
//! Run by the scheduler after warehouse sync and at day start. A clean
//! ledger has every balance within `[0, max]` and no account for a
//! warehouse that no longer exists.

use std::collections::BTreeSet;

use dronehouse_types::WarehouseId;

use crate::{ChargeLedger, LedgerAnomaly};

/// Outcome of an audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResult {
    /// Every account is within bounds and owned by a live warehouse.
    Clean,
    /// At least one problem was found.
    Anomaly(LedgerAnomaly),
}

/// Check every account against its bounds and the live warehouse set.
pub fn audit(ledger: &ChargeLedger, live: &BTreeSet<WarehouseId>) -> AuditResult {
    let mut out_of_bounds = Vec::new();
    let mut orphaned = Vec::new();

    for (warehouse, kind, counter) in ledger.accounts() {
        if !counter.is_within_bounds() {
            out_of_bounds.push((warehouse, kind, counter));
        }
        if !live.contains(&warehouse) {
            orphaned.push((warehouse, kind));
        }
    }

    if out_of_bounds.is_empty() && orphaned.is_empty() {
        return AuditResult::Clean;
    }
    let message = format!(
        "ledger audit: {} account(s) out of bounds, {} orphaned",
        out_of_bounds.len(),
        orphaned.len()
    );
    AuditResult::Anomaly(LedgerAnomaly {
        out_of_bounds,
        orphaned,
        message,
    })
}
