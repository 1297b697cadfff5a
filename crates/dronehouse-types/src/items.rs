//! Item stacks moved between the farm, agents and warehouse chests.

use serde::{Deserialize, Serialize};

/// A quantity of one item kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    /// Host item identifier (for example `"(O)24"` for a parsnip).
    pub item_id: String,
    /// Number of items in the stack.
    pub quantity: u32,
}

impl ItemStack {
    /// Create a stack.
    pub fn new(item_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
        }
    }

    /// Whether the stack holds nothing.
    pub const fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    /// Whether `other` holds the same item and can merge into this stack.
    pub fn stacks_with(&self, other: &Self) -> bool {
        self.item_id == other.item_id
    }
}

/// Total item count across a list of stacks.
pub fn total_quantity(stacks: &[ItemStack]) -> u64 {
    stacks
        .iter()
        .fold(0_u64, |acc, s| acc.saturating_add(u64::from(s.quantity)))
}
