//! # Crossing Configuration System
//!
//! Layered configuration for the crossing simulator.
//!
//! ## Features
//! - **Unified Configuration**: one document for simulation and telemetry settings
//! - **Validation**: range and format checks before anything starts
//! - **Environment Overrides**: `CROSSING_*` variables, nested with `__`

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod simulation;
mod telemetry;
mod validation;

pub use error::ConfigError;
pub use simulation::{SimulationConfig, DEFAULT_MAX_AGENTS};
pub use telemetry::TelemetryConfig;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/crossing.yaml";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "CROSSING_";

/// Top‑level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct CrossingConfig {
    /// Tick scaling, population limit and arbiter policy.
    #[serde(default)]
    #[validate(nested)]
    pub simulation: SimulationConfig,

    /// Logging and console output.
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl CrossingConfig {
    /// Load configuration from the default file and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/crossing.yaml`, if present
    /// 3. `CROSSING_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(CrossingConfig::default()));
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        }
        Self::extract(figment)
    }

    /// Load configuration from an explicit file, still honouring the
    /// environment overrides. The file must exist.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment = Figment::from(Serialized::defaults(CrossingConfig::default()))
            .merge(Yaml::file(path));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
