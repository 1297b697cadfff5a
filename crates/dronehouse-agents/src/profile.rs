//! Role descriptors.
//!
//! Roles differ only in data: how long each phase takes, how fast the agent
//! flies, which ledger counter a launch consumes and whether the agent
//! refills at the hatch. The state machine in [`crate::agent`] reads these
//! and never matches on the role itself.

use serde::{Deserialize, Serialize};

use dronehouse_types::{AgentPhase, ResourceKind, Role, WorkPhase};

/// Phase durations (seconds) and flight speed (tiles per second).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleTiming {
    /// Launch animation.
    pub launch_secs: f64,
    /// Landing animation.
    pub land_secs: f64,
    /// Main work phase (harvest, water, groom, rip).
    pub work_secs: f64,
    /// Farmer failure recovery.
    pub fail_secs: f64,
    /// Farmer debris destruction.
    pub clear_secs: f64,
    /// Refilling charges at the hatch.
    pub refill_secs: f64,
    /// Flight speed.
    pub speed: f64,
}

impl Default for RoleTiming {
    fn default() -> Self {
        Self {
            launch_secs: 0.5,
            land_secs: 0.5,
            work_secs: 1.0,
            fail_secs: 1.5,
            clear_secs: 1.0,
            refill_secs: 2.0,
            speed: 4.0,
        }
    }
}

/// Everything the state machine needs to know about a role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleProfile {
    /// The role described.
    pub role: Role,
    /// Phase timings and speed.
    pub timing: RoleTiming,
    /// Ledger counter a launch consumes, if any.
    pub consumes: Option<ResourceKind>,
    /// Whether landing with an empty counter starts a refill.
    pub refill_at_hatch: bool,
}

impl RoleProfile {
    /// The standard profile for `role`.
    pub const fn for_role(role: Role, timing: RoleTiming, refill_at_hatch: bool) -> Self {
        let consumes = match role {
            Role::Harvester => Some(ResourceKind::Cargo),
            Role::Waterer => Some(ResourceKind::Water),
            Role::Petter => Some(ResourceKind::PetCharge),
            Role::Farmer => None,
        };
        Self {
            role,
            timing,
            consumes,
            refill_at_hatch,
        }
    }

    /// Work variant an agent starts with on arrival.
    pub const fn initial_work(&self) -> WorkPhase {
        match self.role {
            Role::Harvester => WorkPhase::Harvest,
            Role::Waterer => WorkPhase::Water,
            Role::Petter => WorkPhase::Groom,
            Role::Farmer => WorkPhase::Rip,
        }
    }

    /// Phase the agent flies out in after launching.
    pub const fn outbound_phase(&self) -> AgentPhase {
        if self.role.is_farmer() {
            AgentPhase::FlyingToZone
        } else {
            AgentPhase::FlyingToTarget
        }
    }

    /// Duration of a work variant.
    pub const fn work_secs(&self, work: WorkPhase) -> f64 {
        match work {
            WorkPhase::Fail => self.timing.fail_secs,
            WorkPhase::Clear => self.timing.clear_secs,
            WorkPhase::Harvest | WorkPhase::Water | WorkPhase::Groom | WorkPhase::Rip => {
                self.timing.work_secs
            }
        }
    }
}
