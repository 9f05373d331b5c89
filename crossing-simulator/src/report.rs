//! YAML run report: the population, every transition and the decision trace.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crossing_core::{AgentSpec, Decision, TransitionEvent};

use crate::runtime::SimulationOutcome;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub agents: Vec<AgentSpec>,
    pub events: Vec<TransitionEvent>,
    pub decisions: Vec<Decision>,
    pub wall_time: Duration,
}

impl SimulationReport {
    pub fn new(
        agents: &[AgentSpec],
        events: Vec<TransitionEvent>,
        outcome: SimulationOutcome,
    ) -> Self {
        Self {
            agents: agents.to_vec(),
            events,
            decisions: outcome.decisions,
            wall_time: outcome.wall_time,
        }
    }

    pub fn to_yaml(&self) -> Result<String, ReportError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn write_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ReportError> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_yaml::to_writer(&mut writer, self)?;
        writer.flush()?;
        info!(path = %path.display(), decisions = self.decisions.len(), "Report written");
        Ok(())
    }
}
