//! Per-warehouse state: roster, agents, chest, stash and farmer jobs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use dronehouse_agents::Agent;
use dronehouse_types::{ItemStack, Position, Role, Tile, TileRect, WarehouseId};
use dronehouse_world::Chest;

use crate::config::{CapacityConfig, FleetConfig};
use crate::jobs::FarmerQueue;

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// How many agents of each role a warehouse keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    counts: BTreeMap<Role, u32>,
}

impl Roster {
    /// `drones` of every drone role plus `farmers` farmers.
    pub fn uniform(drones: u32, farmers: u32) -> Self {
        let counts = Role::ALL
            .into_iter()
            .map(|role| (role, if role.is_farmer() { farmers } else { drones }))
            .collect();
        Self { counts }
    }

    /// The roster a new warehouse starts with.
    pub fn from_fleet(fleet: &FleetConfig) -> Self {
        Self::uniform(fleet.default_drones, fleet.default_farmers)
    }

    /// Agents of `role`.
    pub fn get(&self, role: Role) -> u32 {
        self.counts.get(&role).copied().unwrap_or(0)
    }

    /// Set the count for `role`.
    pub fn set(&mut self, role: Role, count: u32) {
        self.counts.insert(role, count);
    }

    /// Farmer workers.
    pub fn farmer_count(&self) -> u32 {
        self.get(Role::Farmer)
    }

    /// A copy with every count within the fleet limits.
    #[must_use]
    pub fn clamped(&self, fleet: &FleetConfig) -> Self {
        let counts = Role::ALL
            .into_iter()
            .map(|role| {
                let max = if role.is_farmer() {
                    fleet.max_farmers
                } else {
                    fleet.max_per_role
                };
                (role, self.get(role).min(max))
            })
            .collect();
        Self { counts }
    }
}

// ---------------------------------------------------------------------------
// Warehouse
// ---------------------------------------------------------------------------

/// One drone warehouse.
#[derive(Debug, Clone)]
pub struct Warehouse {
    pub(crate) id: WarehouseId,
    pub(crate) bounds: TileRect,
    pub(crate) roster: Roster,
    pub(crate) agents: Vec<Agent>,
    pub(crate) chest: Chest,
    pub(crate) stash: Vec<ItemStack>,
    pub(crate) jobs: FarmerQueue,
}

impl Warehouse {
    /// An empty warehouse with no agents spawned yet.
    pub const fn new(
        id: WarehouseId,
        bounds: TileRect,
        roster: Roster,
        capacities: &CapacityConfig,
    ) -> Self {
        Self {
            id,
            bounds,
            roster,
            agents: Vec::new(),
            chest: Chest::new(capacities.chest_slots, capacities.max_stack),
            stash: Vec::new(),
            jobs: FarmerQueue::new(),
        }
    }

    /// Building identity.
    pub const fn id(&self) -> WarehouseId {
        self.id
    }

    /// Building footprint.
    pub const fn bounds(&self) -> TileRect {
        self.bounds
    }

    /// Where agents take off and land.
    pub fn hatch(&self) -> Position {
        self.bounds.center()
    }

    /// The tile beacon distances are measured from.
    pub fn center_tile(&self) -> Tile {
        self.bounds.center().tile()
    }

    /// Configured agent counts.
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Live agents.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// The shared chest.
    pub const fn chest(&self) -> &Chest {
        &self.chest
    }

    /// Items waiting for chest space.
    pub fn stash(&self) -> &[ItemStack] {
        &self.stash
    }

    /// Farmer jobs.
    pub const fn jobs(&self) -> &FarmerQueue {
        &self.jobs
    }

    /// Whether any agent is passing through the lid.
    pub fn lid_open(&self) -> bool {
        self.agents.iter().any(|a| a.phase().opens_lid())
    }

    /// Spawn and retire agents until every role matches the roster.
    ///
    /// Idle agents are retired first. Returns the retired agents so the
    /// caller can refund their reservations and keep their payloads.
    pub fn reconcile_agents(&mut self) -> Vec<Agent> {
        let mut retired = Vec::new();
        for role in Role::ALL {
            let wanted = usize::try_from(self.roster.get(role)).unwrap_or(usize::MAX);
            let have = self.agents.iter().filter(|a| a.role() == role).count();
            if have < wanted {
                let hatch = self.hatch();
                for _ in have..wanted {
                    self.agents.push(Agent::new(role, self.id, hatch));
                }
            } else if have > wanted {
                let mut surplus = have.saturating_sub(wanted);
                for idle_first in [true, false] {
                    while surplus > 0 {
                        let Some(pos) = self
                            .agents
                            .iter()
                            .rposition(|a| a.role() == role && a.is_idle() == idle_first)
                        else {
                            break;
                        };
                        retired.push(self.agents.remove(pos));
                        surplus = surplus.saturating_sub(1);
                    }
                }
            }
        }
        if !retired.is_empty() {
            for agent in &retired {
                self.jobs.release_agent(agent.id());
            }
            debug!(warehouse = %self.id, retired = retired.len(), "agents retired");
        }
        retired
    }

    /// Keep items the chest could not take.
    pub fn stash_items(&mut self, items: Vec<ItemStack>) {
        self.stash.extend(items.into_iter().filter(|s| !s.is_empty()));
    }

    /// Retry stashed items into the chest. Returns how many stacks moved.
    pub fn flush_stash(&mut self) -> usize {
        if self.stash.is_empty() {
            return 0;
        }
        let before = self.stash.len();
        let pending = std::mem::take(&mut self.stash);
        self.stash = self.chest.deposit_all(pending);
        before.saturating_sub(self.stash.len())
    }

    /// Apply new chest limits; overflow goes to the stash.
    pub fn resize_chest(&mut self, capacities: &CapacityConfig) {
        let overflow = self
            .chest
            .resize(capacities.chest_slots, capacities.max_stack);
        self.stash_items(overflow);
    }

    /// Everything the warehouse holds: chest, stash and carried payloads.
    pub fn take_everything(&mut self) -> Vec<ItemStack> {
        let mut items = self.chest.take_all();
        items.append(&mut self.stash);
        for agent in &mut self.agents {
            items.extend(agent.unload());
        }
        items
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dronehouse_agents::TargetRef;

    fn warehouse(roster: Roster) -> Warehouse {
        Warehouse::new(
            WarehouseId::new(),
            TileRect::new(0, 0, 3, 2),
            roster,
            &CapacityConfig::default(),
        )
    }

    #[test]
    fn roster_serialises_as_role_map() {
        let json = serde_json::to_string(&Roster::uniform(2, 1)).unwrap();
        assert_eq!(
            json,
            r#"{"Harvester":2,"Waterer":2,"Petter":2,"Farmer":1}"#
        );
    }

    #[test]
    fn clamped_respects_fleet_limits() {
        let mut roster = Roster::uniform(9, 7);
        roster.set(Role::Petter, 1);
        let clamped = roster.clamped(&FleetConfig::default());
        assert_eq!(clamped.get(Role::Harvester), 3);
        assert_eq!(clamped.get(Role::Petter), 1);
        assert_eq!(clamped.farmer_count(), 3);
    }

    #[test]
    fn reconcile_spawns_and_retires_idle_first() {
        let mut wh = warehouse(Roster::uniform(2, 0));
        assert!(wh.reconcile_agents().is_empty());
        assert_eq!(wh.agents().len(), 6);

        let busy = wh
            .agents
            .iter()
            .position(|a| a.role() == Role::Harvester)
            .unwrap();
        let busy_id = wh.agents[busy].id();
        wh.agents[busy]
            .launch(TargetRef::Crop(Tile::new(5, 5)), Position::default(), None, None)
            .unwrap();

        wh.roster.set(Role::Harvester, 1);
        let retired = wh.reconcile_agents();
        assert_eq!(retired.len(), 1);
        assert_ne!(retired[0].id(), busy_id);
        assert!(wh.lid_open());
    }

    #[test]
    fn stash_is_retried_into_the_chest() {
        let mut wh = warehouse(Roster::default());
        wh.chest = Chest::new(1, 5);
        let left = wh.chest.deposit_all(vec![ItemStack::new("(O)24", 5), ItemStack::new("(O)16", 2)]);
        wh.stash_items(left);
        assert_eq!(wh.stash().len(), 1);
        assert_eq!(wh.flush_stash(), 0);
        wh.chest.take_all();
        assert_eq!(wh.flush_stash(), 1);
        assert!(wh.stash().is_empty());
    }

    #[test]
    fn take_everything_includes_payloads() {
        let mut wh = warehouse(Roster::uniform(1, 0));
        wh.reconcile_agents();
        wh.agents[0].load(vec![ItemStack::new("(O)24", 1)]);
        wh.chest.deposit_all(vec![ItemStack::new("(O)16", 3)]);
        wh.stash_items(vec![ItemStack::new("(O)18", 2)]);
        let items = wh.take_everything();
        assert_eq!(dronehouse_types::total_quantity(&items), 6);
        assert_eq!(wh.chest().item_count(), 0);
    }
}
