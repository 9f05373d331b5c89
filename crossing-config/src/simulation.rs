//! Simulation parameters: tick scaling, population limit and the arbiter's
//! policy constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crossing_core::policy::{DEFAULT_DIRECTION, DEFAULT_STARVATION_WINDOW};
use crossing_core::{Direction, SelectionPolicy};

/// Maximum number of agents accepted from one input.
pub const DEFAULT_MAX_AGENTS: usize = 75;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct SimulationConfig {
    /// Real milliseconds per tick.
    #[serde(default = "default_tick_ms")]
    #[validate(range(min = 1, max = 60_000))]
    pub tick_ms: u64,

    /// Maximum population; larger inputs are rejected before starting.
    #[serde(default = "default_max_agents")]
    #[validate(range(min = 1, max = 10_000))]
    pub max_agents: usize,

    /// Direction preferred when both are waiting and nothing has crossed yet.
    #[serde(default = "default_direction")]
    pub default_direction: Direction,

    /// Consecutive same-direction grants before the other side is forced through.
    #[serde(default = "default_starvation_window")]
    #[validate(range(min = 1, max = 1_000))]
    pub starvation_window: u32,
}

fn default_tick_ms() -> u64 {
    100
}

fn default_max_agents() -> usize {
    DEFAULT_MAX_AGENTS
}

fn default_direction() -> Direction {
    DEFAULT_DIRECTION
}

fn default_starvation_window() -> u32 {
    DEFAULT_STARVATION_WINDOW
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            max_agents: default_max_agents(),
            default_direction: default_direction(),
            starvation_window: default_starvation_window(),
        }
    }
}

impl SimulationConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn policy(&self) -> SelectionPolicy {
        SelectionPolicy::new(self.default_direction, self.starvation_window)
    }
}
