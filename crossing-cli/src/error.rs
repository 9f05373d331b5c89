use thiserror::Error;

use crossing_config::ConfigError;
use crossing_core::CrossingError;
use crossing_simulator::ReportError;
use crossing_telemetry::MetricsError;

/// Exit status for invalid input or configuration.
pub const EXIT_INPUT: u8 = 1;
/// Exit status for a synchronization defect detected while running.
pub const EXIT_INVARIANT: u8 = 3;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Crossing(#[from] CrossingError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Crossing(e) if !e.is_configuration() => EXIT_INVARIANT,
            _ => EXIT_INPUT,
        }
    }
}
