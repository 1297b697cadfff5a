//! Per-warehouse capacity and charge counters.
//!
//! Each `(warehouse, resource)` pair owns one [`Counter`]. Counters start
//! full when an account is opened, shrink on [`ChargeLedger::try_consume`]
//! and grow on [`ChargeLedger::refill`], clamped to their maximum.
//! Updates are whole-call: no caller ever observes a half-applied change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use dronehouse_types::{ResourceKind, WarehouseId};

use crate::LedgerError;
use crate::reservations::DailyReservations;

// ---------------------------------------------------------------------------
// Counter
// ---------------------------------------------------------------------------

/// A bounded integer counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counter {
    balance: u32,
    max: u32,
}

impl Counter {
    /// A full counter with the given maximum.
    pub const fn full(max: u32) -> Self {
        Self { balance: max, max }
    }

    /// Current balance.
    pub const fn balance(&self) -> u32 {
        self.balance
    }

    /// Configured maximum.
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Units handed out and not yet refilled.
    pub const fn used(&self) -> u32 {
        self.max.saturating_sub(self.balance)
    }

    /// Whether the balance is within `[0, max]`.
    pub const fn is_within_bounds(&self) -> bool {
        self.balance <= self.max
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// All counters of all warehouses, plus the farm-wide daily reservations.
#[derive(Debug, Default, Clone)]
pub struct ChargeLedger {
    accounts: BTreeMap<(WarehouseId, ResourceKind), Counter>,
    reservations: DailyReservations,
}

impl ChargeLedger {
    /// Create an empty ledger.
    pub const fn new() -> Self {
        Self {
            accounts: BTreeMap::new(),
            reservations: DailyReservations::new(),
        }
    }

    /// Open an account, or resize an existing one.
    ///
    /// New accounts start full. Resizing keeps the used amount where possible
    /// and clamps the balance to the new maximum.
    pub fn open(
        &mut self,
        warehouse: WarehouseId,
        kind: ResourceKind,
        max: u32,
    ) -> Result<(), LedgerError> {
        if max == 0 {
            return Err(LedgerError::ZeroCapacity { warehouse, kind });
        }
        let counter = self
            .accounts
            .entry((warehouse, kind))
            .or_insert_with(|| Counter::full(max));
        if counter.max != max {
            let used = counter.used().min(max);
            *counter = Counter {
                balance: max.saturating_sub(used),
                max,
            };
            debug!(%warehouse, ?kind, max, "ledger account resized");
        }
        Ok(())
    }

    /// Close every account of a removed warehouse.
    pub fn close_warehouse(&mut self, warehouse: WarehouseId) {
        self.accounts.retain(|(w, _), _| *w != warehouse);
    }

    /// Decrement by `amount` if the balance covers it.
    ///
    /// Returns `false` and changes nothing when the balance is short or the
    /// account does not exist.
    pub fn try_consume(&mut self, warehouse: WarehouseId, kind: ResourceKind, amount: u32) -> bool {
        let Some(counter) = self.accounts.get_mut(&(warehouse, kind)) else {
            return false;
        };
        match counter.balance.checked_sub(amount) {
            Some(rest) => {
                counter.balance = rest;
                true
            }
            None => false,
        }
    }

    /// Increment by `amount`, clamped to the maximum.
    ///
    /// Returns the amount actually added.
    pub fn refill(&mut self, warehouse: WarehouseId, kind: ResourceKind, amount: u32) -> u32 {
        let Some(counter) = self.accounts.get_mut(&(warehouse, kind)) else {
            return 0;
        };
        let added = amount.min(counter.used());
        counter.balance = counter.balance.saturating_add(added);
        added
    }

    /// Refill an account to its maximum. Returns the amount added.
    pub fn refill_full(&mut self, warehouse: WarehouseId, kind: ResourceKind) -> u32 {
        self.refill(warehouse, kind, u32::MAX)
    }

    /// Overwrite a balance, clamped to the account maximum.
    ///
    /// Used when restoring saved balances.
    pub fn set_balance(
        &mut self,
        warehouse: WarehouseId,
        kind: ResourceKind,
        balance: u32,
    ) -> Result<(), LedgerError> {
        let counter = self
            .accounts
            .get_mut(&(warehouse, kind))
            .ok_or(LedgerError::UnknownAccount { warehouse, kind })?;
        counter.balance = balance.min(counter.max);
        Ok(())
    }

    /// Current balance, if the account exists.
    pub fn balance(&self, warehouse: WarehouseId, kind: ResourceKind) -> Option<u32> {
        self.counter(warehouse, kind).map(|c| c.balance)
    }

    /// Units handed out and not yet refilled, zero for unknown accounts.
    pub fn used(&self, warehouse: WarehouseId, kind: ResourceKind) -> u32 {
        self.counter(warehouse, kind).map_or(0, |c| c.used())
    }

    /// The counter for an account.
    pub fn counter(&self, warehouse: WarehouseId, kind: ResourceKind) -> Option<Counter> {
        self.accounts.get(&(warehouse, kind)).copied()
    }

    /// Balances of every account of one warehouse.
    pub fn balances_of(&self, warehouse: WarehouseId) -> BTreeMap<ResourceKind, u32> {
        self.accounts
            .iter()
            .filter(|((w, _), _)| *w == warehouse)
            .map(|((_, kind), c)| (*kind, c.balance))
            .collect()
    }

    /// Every account, ordered by warehouse then resource.
    pub fn accounts(&self) -> impl Iterator<Item = (WarehouseId, ResourceKind, Counter)> + '_ {
        self.accounts.iter().map(|((w, k), c)| (*w, *k, *c))
    }

    /// The daily grooming reservations.
    pub const fn reservations(&self) -> &DailyReservations {
        &self.reservations
    }

    /// Mutable access to the daily grooming reservations.
    pub const fn reservations_mut(&mut self) -> &mut DailyReservations {
        &mut self.reservations
    }

    /// Start-of-day reset.
    ///
    /// Always clears the grooming reservations. Cargo, water and pet charge
    /// balances carry over unless `refill_charges` is set, in which case
    /// water and pet charges are topped up to their maximum.
    pub fn daily_reset(&mut self, refill_charges: bool) {
        let cleared = self.reservations.len();
        self.reservations.clear();
        if refill_charges {
            for ((_, kind), counter) in &mut self.accounts {
                if matches!(kind, ResourceKind::Water | ResourceKind::PetCharge) {
                    counter.balance = counter.max;
                }
            }
        }
        debug!(cleared, refill_charges, "ledger daily reset");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dronehouse_types::AnimalId;
    use proptest::prelude::*;

    fn ledger_with(kind: ResourceKind, max: u32) -> (ChargeLedger, WarehouseId) {
        let mut ledger = ChargeLedger::new();
        let w = WarehouseId::new();
        ledger.open(w, kind, max).unwrap();
        (ledger, w)
    }

    #[test]
    fn new_account_starts_full() {
        let (ledger, w) = ledger_with(ResourceKind::Cargo, 5);
        assert_eq!(ledger.balance(w, ResourceKind::Cargo), Some(5));
        assert_eq!(ledger.used(w, ResourceKind::Cargo), 0);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut ledger = ChargeLedger::new();
        let w = WarehouseId::new();
        assert_eq!(
            ledger.open(w, ResourceKind::Water, 0),
            Err(LedgerError::ZeroCapacity {
                warehouse: w,
                kind: ResourceKind::Water
            })
        );
    }

    #[test]
    fn consume_fails_without_balance() {
        let (mut ledger, w) = ledger_with(ResourceKind::Water, 2);
        assert!(ledger.try_consume(w, ResourceKind::Water, 2));
        assert!(!ledger.try_consume(w, ResourceKind::Water, 1));
        assert_eq!(ledger.balance(w, ResourceKind::Water), Some(0));
    }

    #[test]
    fn unknown_account_never_consumes() {
        let mut ledger = ChargeLedger::new();
        assert!(!ledger.try_consume(WarehouseId::new(), ResourceKind::Cargo, 1));
        assert_eq!(ledger.refill(WarehouseId::new(), ResourceKind::Cargo, 1), 0);
    }

    #[test]
    fn refill_clamps_to_max() {
        let (mut ledger, w) = ledger_with(ResourceKind::PetCharge, 4);
        ledger.try_consume(w, ResourceKind::PetCharge, 3);
        assert_eq!(ledger.refill(w, ResourceKind::PetCharge, 10), 3);
        assert_eq!(ledger.balance(w, ResourceKind::PetCharge), Some(4));
    }

    #[test]
    fn resize_keeps_used_amount() {
        let (mut ledger, w) = ledger_with(ResourceKind::Cargo, 5);
        ledger.try_consume(w, ResourceKind::Cargo, 2);
        ledger.open(w, ResourceKind::Cargo, 10).unwrap();
        assert_eq!(ledger.balance(w, ResourceKind::Cargo), Some(8));
        ledger.open(w, ResourceKind::Cargo, 1).unwrap();
        assert_eq!(ledger.balance(w, ResourceKind::Cargo), Some(0));
    }

    #[test]
    fn set_balance_requires_account() {
        let mut ledger = ChargeLedger::new();
        let w = WarehouseId::new();
        assert!(ledger.set_balance(w, ResourceKind::Water, 1).is_err());
        ledger.open(w, ResourceKind::Water, 3).unwrap();
        ledger.set_balance(w, ResourceKind::Water, 9).unwrap();
        assert_eq!(ledger.balance(w, ResourceKind::Water), Some(3));
    }

    #[test]
    fn daily_reset_clears_reservations_and_keeps_balances() {
        let mut ledger = ChargeLedger::new();
        let w = WarehouseId::new();
        ledger.open(w, ResourceKind::Cargo, 5).unwrap();
        ledger.open(w, ResourceKind::Water, 5).unwrap();
        ledger.try_consume(w, ResourceKind::Cargo, 1);
        ledger.try_consume(w, ResourceKind::Water, 2);
        ledger.reservations_mut().reserve(AnimalId(7));

        ledger.daily_reset(false);

        assert!(ledger.reservations().is_empty());
        assert_eq!(ledger.balance(w, ResourceKind::Cargo), Some(4));
        assert_eq!(ledger.balance(w, ResourceKind::Water), Some(3));
    }

    #[test]
    fn daily_reset_can_refill_charges_but_not_cargo() {
        let mut ledger = ChargeLedger::new();
        let w = WarehouseId::new();
        ledger.open(w, ResourceKind::Cargo, 5).unwrap();
        ledger.open(w, ResourceKind::Water, 5).unwrap();
        ledger.try_consume(w, ResourceKind::Cargo, 1);
        ledger.try_consume(w, ResourceKind::Water, 2);

        ledger.daily_reset(true);

        assert_eq!(ledger.balance(w, ResourceKind::Cargo), Some(4));
        assert_eq!(ledger.balance(w, ResourceKind::Water), Some(5));
    }

    #[test]
    fn close_warehouse_drops_accounts() {
        let (mut ledger, w) = ledger_with(ResourceKind::Cargo, 5);
        ledger.close_warehouse(w);
        assert_eq!(ledger.accounts().count(), 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Consume(u32),
        Refill(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0_u32..8).prop_map(Op::Consume),
            (0_u32..8).prop_map(Op::Refill),
        ]
    }

    proptest! {
        #[test]
        fn balance_stays_within_bounds(max in 1_u32..50, ops in proptest::collection::vec(op(), 0..64)) {
            let (mut ledger, w) = ledger_with(ResourceKind::Water, max);
            for op in ops {
                let before = ledger.balance(w, ResourceKind::Water).unwrap();
                match op {
                    Op::Consume(n) => {
                        let ok = ledger.try_consume(w, ResourceKind::Water, n);
                        prop_assert_eq!(ok, before >= n);
                    }
                    Op::Refill(n) => {
                        ledger.refill(w, ResourceKind::Water, n);
                    }
                }
                let counter = ledger.counter(w, ResourceKind::Water).unwrap();
                prop_assert!(counter.is_within_bounds());
                prop_assert!(counter.balance() <= max);
            }
        }
    }
}
