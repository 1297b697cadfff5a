//! Agent lifecycle for the Dronehouse drone scheduler.
//!
//! Every worker, drone or farmer, runs the same state machine:
//!
//! ```text
//! Idle -> Launching -> FlyingToTarget|FlyingToZone -> Working -> FlyingHome -> Landing -> Idle
//!                                                                          \-> Refilling -> Idle
//! ```
//!
//! The machine is role-agnostic. A [`RoleProfile`] supplies the timings,
//! speed and consumed resource; the scheduler decides targets, applies the
//! effects of finished work and tells the agent where to go next.
//!
//! # Modules
//!
//! - [`agent`] -- The [`Agent`] state machine and its [`StepEvent`]s.
//! - [`profile`] -- [`RoleProfile`] and [`RoleTiming`] descriptors.
//! - [`target`] -- [`TargetRef`], the claimable thing an agent works on.
//! - [`error`] -- Error types for invalid transitions.

pub mod agent;
pub mod error;
pub mod profile;
pub mod target;

pub use agent::{ARRIVAL_EPSILON, Agent, AgentView, StepEvent};
pub use error::AgentError;
pub use profile::{RoleProfile, RoleTiming};
pub use target::TargetRef;
