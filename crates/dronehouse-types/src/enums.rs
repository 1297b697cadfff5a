//! Enumeration types for the drone scheduler.
//!
//! Roles and resource kinds are closed sets: every role, every ledger
//! account and every lifecycle phase the rendering layer can observe is
//! listed here.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roles and resources
// ---------------------------------------------------------------------------

/// The job an agent performs for its warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Collects ripe crops, fruit and forage into the warehouse chest.
    Harvester,
    /// Waters dry tilled tiles.
    Waterer,
    /// Grooms farm animals that have not been petted today.
    Petter,
    /// Clears debris inside player-designated zones.
    Farmer,
}

impl Role {
    /// Every role, in console order.
    pub const ALL: [Self; 4] = [Self::Harvester, Self::Waterer, Self::Petter, Self::Farmer];

    /// Stable lowercase name used in logs and persisted rosters.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Harvester => "harvester",
            Self::Waterer => "waterer",
            Self::Petter => "petter",
            Self::Farmer => "farmer",
        }
    }

    /// Whether this role is a farmer worker rather than a drone.
    pub const fn is_farmer(self) -> bool {
        matches!(self, Self::Farmer)
    }
}

/// A per-warehouse consumable counter tracked by the charge ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Free harvest cargo slots (one slot per undeposited harvest load).
    Cargo,
    /// Water charges carried by waterers.
    Water,
    /// Grooming charges carried by petters.
    PetCharge,
}

impl ResourceKind {
    /// Every resource kind.
    pub const ALL: [Self; 3] = [Self::Cargo, Self::Water, Self::PetCharge];
}

/// What a harvestable object is, used by harvester eligibility filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HarvestKind {
    /// A regular ripe crop.
    Crop,
    /// A ripe flowering crop (skippable by configuration).
    FlowerCrop,
    /// A fruit tree carrying fruit (skippable by configuration).
    FruitTree,
    /// Forage lying on the ground.
    Forage,
}

// ---------------------------------------------------------------------------
// Lifecycle phases
// ---------------------------------------------------------------------------

/// Discrete lifecycle state of an agent, as exposed to the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentPhase {
    /// Parked inside the warehouse.
    Idle,
    /// Leaving the hatch (launch animation).
    Launching,
    /// Flying towards a drone target.
    FlyingToTarget,
    /// Flying towards the next tile of a farmer zone.
    FlyingToZone,
    /// Performing role work at the target.
    Working,
    /// Flying back to the hatch.
    FlyingHome,
    /// Entering the hatch (landing animation).
    Landing,
    /// Refilling charges at the hatch after landing empty.
    Refilling,
}

impl AgentPhase {
    /// Whether the agent is outside the warehouse.
    pub const fn is_airborne(self) -> bool {
        matches!(
            self,
            Self::FlyingToTarget | Self::FlyingToZone | Self::Working | Self::FlyingHome
        )
    }

    /// Whether this phase keeps the warehouse lid open.
    pub const fn opens_lid(self) -> bool {
        matches!(self, Self::Launching | Self::Landing | Self::Refilling)
    }
}

/// Role-specific work variant shown while an agent is [`AgentPhase::Working`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkPhase {
    /// Harvester picking a crop or fruit.
    Harvest,
    /// Waterer watering a tile.
    Water,
    /// Petter grooming an animal.
    Groom,
    /// Farmer tearing at debris.
    Rip,
    /// Farmer failed to clear the debris.
    Fail,
    /// Farmer destroying the loosened debris.
    Clear,
}

/// Progress state of a farmer zone job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JobPhase {
    /// Waiting for a free farmer.
    Queued,
    /// A farmer is travelling or ripping at debris.
    Working,
    /// A farmer is recovering from debris it could not clear.
    Failing,
    /// A farmer is destroying debris.
    Clearing,
    /// No work remains; pruned by the next trim pass.
    Done,
}

impl JobPhase {
    /// Whether the job has finished and is waiting to be pruned.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Map the work variant of the lead farmer to the job phase.
    pub const fn from_work(work: WorkPhase) -> Self {
        match work {
            WorkPhase::Fail => Self::Failing,
            WorkPhase::Clear => Self::Clearing,
            WorkPhase::Harvest | WorkPhase::Water | WorkPhase::Groom | WorkPhase::Rip => {
                Self::Working
            }
        }
    }
}

// ---------------------------------------------------------------------------
// User-facing messages
// ---------------------------------------------------------------------------

/// A user-facing message the UI layer translates and shows as HUD feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MessageKey {
    /// Zone selection started; shows the key/button instructions.
    SelectionStarted,
    /// Zone selection was cancelled by the player.
    SelectionCancelled,
    /// No warehouse exists on the farm.
    NoWarehouse,
    /// The warehouse has no farmer workers.
    NoFarmer,
    /// The beacon lies outside the allowed radius around the warehouse.
    BeaconTooFar,
    /// The projected zone would exceed the configured tile cap.
    ZoneTooLarge,
    /// The session already holds the maximum number of beacons.
    TooManyBeacons,
    /// Commit was requested without any beacon placed.
    NoBeacons,
    /// Every farmer of the warehouse already has a job.
    NoFreeFarmer,
    /// A new farmer job was queued.
    JobQueued,
    /// A roster change would exceed the per-role limit.
    RosterLimit,
    /// A roster change was applied.
    RosterUpdated,
}

impl MessageKey {
    /// Translation key looked up by the UI layer.
    pub const fn key(self) -> &'static str {
        match self {
            Self::SelectionStarted => "hud.plant.instructions",
            Self::SelectionCancelled => "hud.selection.cancelled",
            Self::NoWarehouse => "hud.noWarehouse",
            Self::NoFarmer => "hud.noFarmer",
            Self::BeaconTooFar => "selection.beaconTooFar",
            Self::ZoneTooLarge => "selection.zoneTooLarge",
            Self::TooManyBeacons => "selection.tooManyBeacons",
            Self::NoBeacons => "selection.noBeacons",
            Self::NoFreeFarmer => "selection.noFreeFarmer",
            Self::JobQueued => "selection.jobQueued",
            Self::RosterLimit => "console.rosterLimit",
            Self::RosterUpdated => "console.rosterUpdated",
        }
    }

    /// Whether the message reports a rejection (shown as an error HUD message).
    pub const fn is_error(self) -> bool {
        matches!(
            self,
            Self::NoWarehouse
                | Self::NoFarmer
                | Self::BeaconTooFar
                | Self::ZoneTooLarge
                | Self::TooManyBeacons
                | Self::NoBeacons
                | Self::NoFreeFarmer
                | Self::RosterLimit
        )
    }
}
