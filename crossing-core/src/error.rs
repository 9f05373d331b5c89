use thiserror::Error;

use crate::agent::AgentId;

#[derive(Debug, Error)]
pub enum CrossingError {
    /// Malformed or out-of-range input record. Detected before any thread starts.
    #[error("Invalid record on line {line}: {reason}")]
    Config { line: usize, reason: String },

    #[error("Agent count {count} exceeds the maximum population of {max}")]
    Capacity { count: usize, max: usize },

    /// A synchronization defect. Never recovered from.
    #[error("Invariant violated by agent {agent}: {detail} (arbiter state: {state})")]
    InvariantViolation {
        agent: AgentId,
        detail: String,
        state: String,
    },

    /// The run was torn down because another thread failed.
    #[error("Simulation aborted after agent {agent} failed: {reason}")]
    Aborted { agent: AgentId, reason: String },

    #[error("Agent {0} thread panicked")]
    AgentPanicked(AgentId),

    #[error("Arbiter thread panicked")]
    ArbiterPanicked,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrossingError {
    /// The agent the error is attributed to, if any.
    pub fn agent(&self) -> Option<AgentId> {
        match self {
            CrossingError::InvariantViolation { agent, .. }
            | CrossingError::Aborted { agent, .. }
            | CrossingError::AgentPanicked(agent) => Some(*agent),
            _ => None,
        }
    }

    /// True for errors raised while loading input, before the simulation runs.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CrossingError::Config { .. } | CrossingError::Capacity { .. } | CrossingError::Io(_)
        )
    }
}
