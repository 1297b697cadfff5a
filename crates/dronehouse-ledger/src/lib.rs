//! Capacity and charge ledger for the Dronehouse drone scheduler.
//!
//! Every consumable a warehouse hands out to its drones is tracked here:
//! harvest cargo slots, water charges and pet-grooming charges. A counter
//! only moves through [`ChargeLedger::try_consume`] and
//! [`ChargeLedger::refill`], and always stays within `[0, max]`.
//!
//! # Modules
//!
//! - [`ledger`] -- The [`ChargeLedger`]: per-warehouse, per-resource counters.
//! - [`reservations`] -- The daily set of animals already groomed today.
//! - [`audit`] -- Bounds and orphan-account verification.
//!
//! # Usage
//!
//! ```
//! use dronehouse_ledger::ChargeLedger;
//! use dronehouse_types::{ResourceKind, WarehouseId};
//!
//! let mut ledger = ChargeLedger::new();
//! let warehouse = WarehouseId::new();
//! ledger.open(warehouse, ResourceKind::Water, 5).ok();
//!
//! assert!(ledger.try_consume(warehouse, ResourceKind::Water, 2));
//! assert!(!ledger.try_consume(warehouse, ResourceKind::Water, 4));
//! assert_eq!(ledger.balance(warehouse, ResourceKind::Water), Some(3));
//! ```

pub mod audit;
pub mod ledger;
pub mod reservations;

pub use audit::AuditResult;
pub use ledger::{ChargeLedger, Counter};
pub use reservations::DailyReservations;

use dronehouse_types::{ResourceKind, WarehouseId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors returned by direct ledger calls.
///
/// Gameplay paths never see these: an empty counter is a `false` from
/// [`ChargeLedger::try_consume`], not an error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    /// No account is open for this warehouse and resource.
    #[error("no {kind:?} account open for warehouse {warehouse}")]
    UnknownAccount {
        /// The warehouse queried.
        warehouse: WarehouseId,
        /// The resource queried.
        kind: ResourceKind,
    },

    /// Accounts must have a positive maximum.
    #[error("{kind:?} account for warehouse {warehouse} needs a positive maximum")]
    ZeroCapacity {
        /// The warehouse being opened.
        warehouse: WarehouseId,
        /// The resource being opened.
        kind: ResourceKind,
    },
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// An integrity problem found by [`audit::audit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAnomaly {
    /// Accounts whose balance exceeds their maximum.
    pub out_of_bounds: Vec<(WarehouseId, ResourceKind, Counter)>,
    /// Accounts whose warehouse is no longer live.
    pub orphaned: Vec<(WarehouseId, ResourceKind)>,
    /// Human-readable description.
    pub message: String,
}

impl core::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
