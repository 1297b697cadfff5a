//! The role-agnostic agent state machine.
//!
//! [`Agent::advance`] moves an agent through its timed and travel phases
//! and reports at most one [`StepEvent`] per call. Everything that depends
//! on the world (what to work on, what the work produced, where to go next)
//! is decided by the caller, which then drives the agent through the
//! explicit transition methods.
//!
//! Time is measured in seconds and distance in tiles. The rendering layer
//! reads [`AgentView`]: the discrete phase plus seconds spent in it.

use serde::Serialize;

use dronehouse_types::{
    AgentId, AgentPhase, ItemStack, JobId, Position, ResourceKind, Role, WarehouseId, WorkPhase,
};

use crate::error::AgentError;
use crate::profile::RoleProfile;
use crate::target::TargetRef;

/// Distance (tiles) under which an agent counts as arrived.
pub const ARRIVAL_EPSILON: f64 = 0.05;

/// Something that happened during [`Agent::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// Launch finished; the agent is now flying out.
    Launched,
    /// The agent reached its destination and started working.
    Arrived,
    /// A work variant finished. The caller applies its effect and chooses
    /// the next transition.
    WorkFinished(WorkPhase),
    /// The agent is over the hatch and starts landing.
    ReachedHome,
    /// Landing finished; the agent is idle inside the warehouse.
    Landed,
    /// Refilling finished; the agent is idle again.
    Refilled,
}

/// What the rendering layer sees of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgentView {
    /// Agent identity.
    pub id: AgentId,
    /// Role.
    pub role: Role,
    /// Discrete lifecycle phase.
    pub phase: AgentPhase,
    /// Work variant while working.
    pub work: Option<WorkPhase>,
    /// Seconds spent in the current phase.
    pub elapsed: f64,
    /// Current position in tile space.
    pub position: Position,
    /// Whether the agent carries items.
    pub loaded: bool,
}

/// One worker.
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    role: Role,
    home: WarehouseId,
    hatch: Position,
    phase: AgentPhase,
    elapsed: f64,
    position: Position,
    destination: Position,
    target: Option<TargetRef>,
    work: Option<WorkPhase>,
    job: Option<JobId>,
    payload: Vec<ItemStack>,
    reserved: Option<ResourceKind>,
}

impl Agent {
    /// A new idle agent parked at `hatch`.
    pub fn new(role: Role, home: WarehouseId, hatch: Position) -> Self {
        Self {
            id: AgentId::new(),
            role,
            home,
            hatch,
            phase: AgentPhase::Idle,
            elapsed: 0.0,
            position: hatch,
            destination: hatch,
            target: None,
            work: None,
            job: None,
            payload: Vec::new(),
            reserved: None,
        }
    }

    // ---- accessors ----

    /// Agent identity.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Role.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Home warehouse.
    pub const fn home(&self) -> WarehouseId {
        self.home
    }

    /// Current phase.
    pub const fn phase(&self) -> AgentPhase {
        self.phase
    }

    /// Whether the agent is parked and free for a new launch.
    pub const fn is_idle(&self) -> bool {
        matches!(self.phase, AgentPhase::Idle)
    }

    /// Current position.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// The target the agent holds, if any.
    pub const fn target(&self) -> Option<TargetRef> {
        self.target
    }

    /// The farmer job the agent works on, if any.
    pub const fn job(&self) -> Option<JobId> {
        self.job
    }

    /// Current work variant.
    pub const fn work(&self) -> Option<WorkPhase> {
        self.work
    }

    /// Ledger unit taken at launch and not yet spent or refunded.
    pub const fn reserved(&self) -> Option<ResourceKind> {
        self.reserved
    }

    /// Carried items.
    pub fn payload(&self) -> &[ItemStack] {
        &self.payload
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> AgentView {
        AgentView {
            id: self.id,
            role: self.role,
            phase: self.phase,
            work: self.work,
            elapsed: self.elapsed,
            position: self.position,
            loaded: !self.payload.is_empty(),
        }
    }

    // ---- transitions ----

    const fn enter(&mut self, phase: AgentPhase) {
        self.phase = phase;
        self.elapsed = 0.0;
    }

    const fn invalid(&self, action: &'static str) -> AgentError {
        AgentError::InvalidTransition {
            agent: self.id,
            phase: self.phase,
            action,
        }
    }

    /// Start a trip to `target` at `destination`.
    ///
    /// `reserved` is the ledger unit taken for this trip; it is handed back
    /// by [`Agent::settle`] or [`Agent::take_reservation`].
    pub fn launch(
        &mut self,
        target: TargetRef,
        destination: Position,
        job: Option<JobId>,
        reserved: Option<ResourceKind>,
    ) -> Result<(), AgentError> {
        if !self.is_idle() {
            return Err(self.invalid("launch"));
        }
        self.target = Some(target);
        self.destination = destination;
        self.job = job;
        self.reserved = reserved;
        self.work = None;
        self.enter(AgentPhase::Launching);
        Ok(())
    }

    /// Follow a moving target while flying out.
    pub const fn set_destination(&mut self, destination: Position) {
        if matches!(
            self.phase,
            AgentPhase::Launching | AgentPhase::FlyingToTarget | AgentPhase::FlyingToZone
        ) {
            self.destination = destination;
        }
    }

    /// Switch to another work variant at the same target.
    pub fn continue_work(&mut self, work: WorkPhase) -> Result<(), AgentError> {
        if self.phase != AgentPhase::Working {
            return Err(self.invalid("continue work"));
        }
        self.work = Some(work);
        self.elapsed = 0.0;
        Ok(())
    }

    /// Fly on to the next zone tile without returning home.
    pub fn retarget(&mut self, target: TargetRef, destination: Position) -> Result<(), AgentError> {
        if self.phase != AgentPhase::Working {
            return Err(self.invalid("retarget"));
        }
        self.target = Some(target);
        self.destination = destination;
        self.work = None;
        self.enter(AgentPhase::FlyingToZone);
        Ok(())
    }

    /// Drop the target and head back to the hatch.
    ///
    /// Valid from any phase outside the warehouse, and from launching.
    pub fn fly_home(&mut self) -> Result<(), AgentError> {
        if !(self.phase.is_airborne() || self.phase == AgentPhase::Launching) {
            return Err(self.invalid("fly home"));
        }
        self.target = None;
        self.job = None;
        self.work = None;
        self.destination = self.hatch;
        self.enter(AgentPhase::FlyingHome);
        Ok(())
    }

    /// Start refilling after landing.
    pub fn begin_refill(&mut self) -> Result<(), AgentError> {
        if !self.is_idle() {
            return Err(self.invalid("refill"));
        }
        self.enter(AgentPhase::Refilling);
        Ok(())
    }

    /// Mark the reserved ledger unit as spent by the work effect.
    pub const fn settle(&mut self) -> Option<ResourceKind> {
        self.reserved.take()
    }

    /// Take back an unspent ledger unit for refund.
    pub const fn take_reservation(&mut self) -> Option<ResourceKind> {
        self.reserved.take()
    }

    /// Add harvested items to the payload.
    pub fn load(&mut self, items: Vec<ItemStack>) {
        self.payload.extend(items);
    }

    /// Remove the whole payload.
    pub fn unload(&mut self) -> Vec<ItemStack> {
        std::mem::take(&mut self.payload)
    }

    /// Park the agent at the hatch immediately, dropping its trip.
    ///
    /// Returns the payload it carried. Any reservation should be taken
    /// before calling this.
    pub fn reset_idle(&mut self) -> Vec<ItemStack> {
        self.target = None;
        self.job = None;
        self.work = None;
        self.reserved = None;
        self.position = self.hatch;
        self.destination = self.hatch;
        self.enter(AgentPhase::Idle);
        self.unload()
    }

    // ---- stepping ----

    /// Advance by `dt` seconds.
    pub fn advance(&mut self, dt: f64, profile: &RoleProfile) -> Option<StepEvent> {
        self.elapsed += dt;
        let timing = &profile.timing;
        match self.phase {
            AgentPhase::Idle => None,
            AgentPhase::Launching => (self.elapsed >= timing.launch_secs).then(|| {
                self.enter(profile.outbound_phase());
                StepEvent::Launched
            }),
            AgentPhase::FlyingToTarget | AgentPhase::FlyingToZone => {
                self.fly(dt, timing.speed).then(|| {
                    self.work = Some(profile.initial_work());
                    self.enter(AgentPhase::Working);
                    StepEvent::Arrived
                })
            }
            AgentPhase::Working => {
                let work = self.work.unwrap_or_else(|| profile.initial_work());
                (self.elapsed >= profile.work_secs(work)).then_some(StepEvent::WorkFinished(work))
            }
            AgentPhase::FlyingHome => self.fly(dt, timing.speed).then(|| {
                self.enter(AgentPhase::Landing);
                StepEvent::ReachedHome
            }),
            AgentPhase::Landing => (self.elapsed >= timing.land_secs).then(|| {
                self.position = self.hatch;
                self.enter(AgentPhase::Idle);
                StepEvent::Landed
            }),
            AgentPhase::Refilling => (self.elapsed >= timing.refill_secs).then(|| {
                self.enter(AgentPhase::Idle);
                StepEvent::Refilled
            }),
        }
    }

    /// Move towards the destination. Returns whether the agent arrived.
    fn fly(&mut self, dt: f64, speed: f64) -> bool {
        self.position = self.position.move_toward(self.destination, speed * dt);
        self.position.distance(self.destination) <= ARRIVAL_EPSILON
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::profile::RoleTiming;
    use dronehouse_types::Tile;

    const DT: f64 = 1.0 / 60.0;

    fn profile(role: Role) -> RoleProfile {
        RoleProfile::for_role(role, RoleTiming::default(), true)
    }

    fn run_until(agent: &mut Agent, profile: &RoleProfile, wanted: StepEvent) -> u32 {
        for tick in 0..10_000 {
            if agent.advance(DT, profile) == Some(wanted) {
                return tick;
            }
        }
        u32::MAX
    }

    #[test]
    fn idle_agent_stays_idle() {
        let mut agent = Agent::new(Role::Harvester, WarehouseId::new(), Position::default());
        assert_eq!(agent.advance(1.0, &profile(Role::Harvester)), None);
        assert!(agent.is_idle());
    }

    #[test]
    fn drone_completes_full_cycle() {
        let p = profile(Role::Harvester);
        let hatch = Tile::new(0, 0).center();
        let crop = Tile::new(3, 0);
        let mut agent = Agent::new(Role::Harvester, WarehouseId::new(), hatch);
        agent
            .launch(TargetRef::Crop(crop), crop.center(), None, Some(ResourceKind::Cargo))
            .unwrap();

        assert!(run_until(&mut agent, &p, StepEvent::Launched) < 10_000);
        assert_eq!(agent.phase(), AgentPhase::FlyingToTarget);
        assert!(run_until(&mut agent, &p, StepEvent::Arrived) < 10_000);
        assert_eq!(agent.work(), Some(WorkPhase::Harvest));
        assert!(run_until(&mut agent, &p, StepEvent::WorkFinished(WorkPhase::Harvest)) < 10_000);

        assert_eq!(agent.settle(), Some(ResourceKind::Cargo));
        agent.fly_home().unwrap();
        assert!(run_until(&mut agent, &p, StepEvent::ReachedHome) < 10_000);
        assert!(run_until(&mut agent, &p, StepEvent::Landed) < 10_000);
        assert!(agent.is_idle());
        assert!(agent.position().distance(hatch) < ARRIVAL_EPSILON);
    }

    #[test]
    fn flight_time_follows_speed() {
        let p = profile(Role::Waterer);
        let mut agent = Agent::new(Role::Waterer, WarehouseId::new(), Position::new(0.0, 0.0));
        agent
            .launch(TargetRef::DryTile(Tile::new(8, 0)), Position::new(8.0, 0.0), None, None)
            .unwrap();
        run_until(&mut agent, &p, StepEvent::Launched);
        let ticks = run_until(&mut agent, &p, StepEvent::Arrived);
        // 8 tiles at 4 tiles/s is two seconds of flight.
        assert!((115..=121).contains(&ticks));
    }

    #[test]
    fn farmer_chains_work_variants() {
        let p = profile(Role::Farmer);
        let mut agent = Agent::new(Role::Farmer, WarehouseId::new(), Position::default());
        let job = JobId::new();
        agent
            .launch(TargetRef::Debris(Tile::new(1, 1)), Tile::new(1, 1).center(), Some(job), None)
            .unwrap();
        run_until(&mut agent, &p, StepEvent::Launched);
        assert_eq!(agent.phase(), AgentPhase::FlyingToZone);
        run_until(&mut agent, &p, StepEvent::Arrived);
        run_until(&mut agent, &p, StepEvent::WorkFinished(WorkPhase::Rip));
        agent.continue_work(WorkPhase::Clear).unwrap();
        run_until(&mut agent, &p, StepEvent::WorkFinished(WorkPhase::Clear));
        agent
            .retarget(TargetRef::Debris(Tile::new(2, 1)), Tile::new(2, 1).center())
            .unwrap();
        assert_eq!(agent.phase(), AgentPhase::FlyingToZone);
        assert_eq!(agent.job(), Some(job));
    }

    #[test]
    fn abort_returns_home_and_keeps_reservation_for_refund() {
        let p = profile(Role::Petter);
        let mut agent = Agent::new(Role::Petter, WarehouseId::new(), Position::default());
        agent
            .launch(
                TargetRef::Animal(dronehouse_types::AnimalId(1)),
                Position::new(5.0, 5.0),
                None,
                Some(ResourceKind::PetCharge),
            )
            .unwrap();
        run_until(&mut agent, &p, StepEvent::Launched);
        agent.fly_home().unwrap();
        assert_eq!(agent.target(), None);
        assert_eq!(agent.take_reservation(), Some(ResourceKind::PetCharge));
        assert_eq!(agent.take_reservation(), None);
    }

    #[test]
    fn invalid_transitions_are_errors() {
        let mut agent = Agent::new(Role::Waterer, WarehouseId::new(), Position::default());
        assert!(matches!(
            agent.fly_home(),
            Err(AgentError::InvalidTransition { action: "fly home", .. })
        ));
        assert!(agent.continue_work(WorkPhase::Water).is_err());
        agent
            .launch(TargetRef::DryTile(Tile::new(1, 1)), Position::default(), None, None)
            .unwrap();
        assert!(agent.begin_refill().is_err());
        assert!(
            agent
                .launch(TargetRef::DryTile(Tile::new(2, 2)), Position::default(), None, None)
                .is_err()
        );
    }

    #[test]
    fn reset_idle_returns_payload() {
        let mut agent = Agent::new(Role::Harvester, WarehouseId::new(), Position::default());
        agent.load(vec![ItemStack::new("(O)24", 2)]);
        let items = agent.reset_idle();
        assert_eq!(items, vec![ItemStack::new("(O)24", 2)]);
        assert!(agent.payload().is_empty());
        assert!(!agent.view().loaded);
    }
}
