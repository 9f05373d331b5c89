//! Agents competing for the crossing.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Condvar;
use serde::{Deserialize, Serialize};

/// Agent identifier, assigned 0.. in input order.
pub type AgentId = usize;

/// Travel direction over the crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    East,
    West,
}

impl Direction {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::East => "East",
            Direction::West => "West",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "east" | "e" => Ok(Direction::East),
            "west" | "w" => Ok(Direction::West),
            other => Err(format!("unknown direction '{other}' (expected east or west)")),
        }
    }
}

/// Priority class. `Expedited` agents always go before `Standard` ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityClass {
    Standard,
    Expedited,
}

impl PriorityClass {
    pub fn label(self) -> &'static str {
        match self {
            PriorityClass::Standard => "standard",
            PriorityClass::Expedited => "expedited",
        }
    }
}

/// Immutable description of one agent, validated before any thread starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: AgentId,
    pub direction: Direction,
    pub priority: PriorityClass,
    /// Ticks spent preparing before the agent becomes ready.
    pub preparation: u32,
    /// Ticks spent on the crossing once granted.
    pub usage: u32,
}

impl AgentSpec {
    pub fn new(
        id: AgentId,
        direction: Direction,
        priority: PriorityClass,
        preparation: u32,
        usage: u32,
    ) -> Self {
        Self {
            id,
            direction,
            priority,
            preparation,
            usage,
        }
    }

    /// Decodes one of the four record symbols: `e`/`E` east, `w`/`W` west,
    /// upper case meaning expedited.
    pub fn decode_symbol(symbol: char) -> Option<(Direction, PriorityClass)> {
        match symbol {
            'e' => Some((Direction::East, PriorityClass::Standard)),
            'E' => Some((Direction::East, PriorityClass::Expedited)),
            'w' => Some((Direction::West, PriorityClass::Standard)),
            'W' => Some((Direction::West, PriorityClass::Expedited)),
            _ => None,
        }
    }

    /// The record symbol for this agent's direction and priority.
    pub fn symbol(&self) -> char {
        match (self.direction, self.priority) {
            (Direction::East, PriorityClass::Standard) => 'e',
            (Direction::East, PriorityClass::Expedited) => 'E',
            (Direction::West, PriorityClass::Standard) => 'w',
            (Direction::West, PriorityClass::Expedited) => 'W',
        }
    }
}

/// Mutable per-agent state. Lives inside the arbiter's lock.
#[derive(Debug)]
pub(crate) struct AgentSlot {
    pub spec: AgentSpec,
    /// Stamped once, at the prepare -> ready transition.
    pub ready_at: Option<Duration>,
    /// Set only by the arbiter.
    pub granted: bool,
    /// Set only by the agent's own driver. Implies `granted`.
    pub completed: bool,
    /// Dedicated "you are granted" notification. Released on completion.
    pub grant_signal: Option<Arc<Condvar>>,
}

impl AgentSlot {
    pub fn new(spec: AgentSpec) -> Self {
        Self {
            spec,
            ready_at: None,
            granted: false,
            completed: false,
            grant_signal: Some(Arc::new(Condvar::new())),
        }
    }
}
