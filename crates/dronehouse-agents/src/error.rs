//! Error types for the `dronehouse-agents` crate.

use dronehouse_types::{AgentId, AgentPhase};

/// Errors raised when the scheduler asks an agent for a transition its
/// current phase does not allow.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AgentError {
    /// The requested transition is not valid from the current phase.
    #[error("agent {agent} cannot {action} while {phase:?}")]
    InvalidTransition {
        /// The agent.
        agent: AgentId,
        /// The phase it was in.
        phase: AgentPhase,
        /// What was requested.
        action: &'static str,
    },
}
