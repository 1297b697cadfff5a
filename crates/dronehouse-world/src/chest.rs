//! The shared warehouse chest.
//!
//! A chest has a fixed number of slots, each holding one stack of at most
//! `max_stack` items. Deposits merge into existing stacks first, then take
//! free slots. Whatever does not fit is handed back to the caller; the
//! chest never discards items.

use serde::{Deserialize, Serialize};

use dronehouse_types::ItemStack;

/// A bounded item store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chest {
    slots: u32,
    max_stack: u32,
    stacks: Vec<ItemStack>,
}

impl Chest {
    /// An empty chest.
    pub const fn new(slots: u32, max_stack: u32) -> Self {
        Self {
            slots,
            max_stack,
            stacks: Vec::new(),
        }
    }

    /// Rebuild a chest from saved stacks.
    ///
    /// Returns the chest and whatever no longer fits under the current
    /// limits.
    pub fn restore(slots: u32, max_stack: u32, saved: Vec<ItemStack>) -> (Self, Vec<ItemStack>) {
        let mut chest = Self::new(slots, max_stack);
        let overflow = saved
            .into_iter()
            .filter_map(|stack| chest.deposit(stack))
            .collect();
        (chest, overflow)
    }

    /// Deposit a stack. Returns the part that did not fit.
    pub fn deposit(&mut self, mut stack: ItemStack) -> Option<ItemStack> {
        for existing in &mut self.stacks {
            if stack.is_empty() {
                break;
            }
            if existing.stacks_with(&stack) {
                let room = self.max_stack.saturating_sub(existing.quantity);
                let moved = room.min(stack.quantity);
                existing.quantity = existing.quantity.saturating_add(moved);
                stack.quantity = stack.quantity.saturating_sub(moved);
            }
        }
        while !stack.is_empty() && self.free_slots() > 0 && self.max_stack > 0 {
            let moved = self.max_stack.min(stack.quantity);
            self.stacks.push(ItemStack::new(stack.item_id.clone(), moved));
            stack.quantity = stack.quantity.saturating_sub(moved);
        }
        if stack.is_empty() { None } else { Some(stack) }
    }

    /// Deposit several stacks. Returns everything that did not fit.
    pub fn deposit_all(&mut self, stacks: Vec<ItemStack>) -> Vec<ItemStack> {
        stacks
            .into_iter()
            .filter_map(|stack| self.deposit(stack))
            .collect()
    }

    /// Unused slots.
    pub fn free_slots(&self) -> u32 {
        let used = u32::try_from(self.stacks.len()).unwrap_or(u32::MAX);
        self.slots.saturating_sub(used)
    }

    /// Current contents.
    pub fn contents(&self) -> &[ItemStack] {
        &self.stacks
    }

    /// Total number of items stored.
    pub fn item_count(&self) -> u64 {
        dronehouse_types::total_quantity(&self.stacks)
    }

    /// Remove and return everything.
    pub fn take_all(&mut self) -> Vec<ItemStack> {
        std::mem::take(&mut self.stacks)
    }

    /// Change the slot limits, returning stacks that no longer fit.
    pub fn resize(&mut self, slots: u32, max_stack: u32) -> Vec<ItemStack> {
        if slots == self.slots && max_stack == self.max_stack {
            return Vec::new();
        }
        let (chest, overflow) = Self::restore(slots, max_stack, self.take_all());
        *self = chest;
        overflow
    }
}
