/*!
# Crossing Simulator

Drives a population of agents across the one-track crossing. Each agent runs
on its own OS thread and the arbiter on another; all of them share a single
[`crossing_core::Arbiter`].

## Key Components:
- **Records:** parsing of `<symbol> <preparation> <usage>` input lines.
- **Runtime:** thread spawning, joining and failure propagation.
- **Sink:** console transition lines, structured logs and metrics.
- **Report:** YAML dump of a completed run.
*/

pub mod records;
pub mod report;
pub mod runtime;
pub mod sink;

pub use records::{load_records, parse_records};
pub use report::{ReportError, SimulationReport};
pub use runtime::{Simulation, SimulationOutcome};
pub use sink::ConsoleSink;
