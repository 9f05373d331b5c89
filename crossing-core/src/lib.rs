//! # crossing-core
//!
//! Coordination core for a single-track crossing shared by many independently
//! timed agents. A central [`Arbiter`] grants the crossing to one agent at a
//! time, preferring expedited agents, alternating directions, and forcing a
//! direction switch after a bounded streak.
//!
//! ### Key Submodules:
//! - `time`: simulation clock and elapsed-time formatting
//! - `agent`: agent identity, direction, priority and timing
//! - `registry`: agents waiting for the crossing
//! - `policy`: lock-free selection rules
//! - `arbiter`: lock/condition-variable protocol and decision loop
//! - `driver`: per-agent lifecycle
//! - `events`: transition events and sinks

pub mod agent;
pub mod arbiter;
pub mod driver;
pub mod error;
pub mod events;
pub mod policy;
pub mod registry;
pub mod time;

pub mod prelude {
    pub use crate::agent::*;
    pub use crate::arbiter::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::policy::*;
    pub use crate::time::*;
}

pub use agent::{AgentId, AgentSpec, Direction, PriorityClass};
pub use arbiter::{Arbiter, Decision};
pub use error::CrossingError;
pub use events::{EventSink, RecordingSink, TransitionEvent, TransitionKind};
pub use policy::{Candidate, GrantHistory, SelectionPolicy};
pub use time::{Clock, SimClock};
