//! Animals already groomed today.
//!
//! The set only grows during a day: petters add the animal they finished,
//! and the periodic refresh folds in animals the host reports as petted by
//! other means. [`ChargeLedger::daily_reset`](crate::ChargeLedger::daily_reset)
//! empties it.

use std::collections::BTreeSet;

use dronehouse_types::AnimalId;

/// The daily grooming reservation set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DailyReservations {
    groomed: BTreeSet<AnimalId>,
}

impl DailyReservations {
    /// An empty set.
    pub const fn new() -> Self {
        Self {
            groomed: BTreeSet::new(),
        }
    }

    /// Reserve an animal for today. Returns `false` if it already was.
    pub fn reserve(&mut self, animal: AnimalId) -> bool {
        self.groomed.insert(animal)
    }

    /// Whether the animal was already groomed today.
    pub fn is_reserved(&self, animal: AnimalId) -> bool {
        self.groomed.contains(&animal)
    }

    /// Fold in animals the host reports as petted.
    pub fn refresh(&mut self, petted: impl IntoIterator<Item = AnimalId>) {
        self.groomed.extend(petted);
    }

    /// Number of reserved animals.
    pub fn len(&self) -> usize {
        self.groomed.len()
    }

    /// Whether no animal is reserved.
    pub fn is_empty(&self) -> bool {
        self.groomed.is_empty()
    }

    /// Forget every reservation.
    pub fn clear(&mut self) {
        self.groomed.clear();
    }
}
