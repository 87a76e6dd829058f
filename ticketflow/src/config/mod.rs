//! Application configuration.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`TICKETFLOW_*`, `__` separates sections)
//! 2. An optional TOML file
//! 3. Built-in defaults
//!
//! `TICKETFLOW_SERVICE__API_KEY` maps to `service.api_key`,
//! `TICKETFLOW_PIPELINE__MODE` to `pipeline.mode`.

mod loader;

pub use loader::{figment, load_config, load_config_from_str};

use crate::errors::TicketflowError;
use crate::service::ServiceConfig;
use crate::utils::positive_duration;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The given file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// A source could not be parsed or has the wrong shape.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// The values parsed but cannot be used.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<ConfigError> for TicketflowError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// How independent stages are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One stage at a time, in declaration order.
    #[default]
    Sequential,
    /// Every stage whose dependencies are done runs at once.
    Parallel,
}

/// Run-time behavior of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Stage scheduling.
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Bound on each remote call in seconds.
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_seconds: f64,
    /// Treat malformed stage output as empty instead of failing the stage.
    #[serde(default)]
    pub lenient_payloads: bool,
}

fn default_stage_timeout() -> f64 {
    120.0
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            stage_timeout_seconds: default_stage_timeout(),
            lenient_payloads: false,
        }
    }
}

impl PipelineConfig {
    /// The built-in per-call timeout.
    pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(120);

    /// Sets the execution mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_stage_timeout(mut self, seconds: f64) -> Self {
        self.stage_timeout_seconds = seconds;
        self
    }

    /// Sets the malformed-payload policy.
    #[must_use]
    pub fn with_lenient_payloads(mut self, lenient: bool) -> Self {
        self.lenient_payloads = lenient;
        self
    }

    /// The per-call timeout as a duration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] unless the timeout is a
    /// positive number of seconds that fits in a [`Duration`].
    pub fn stage_timeout(&self) -> Result<Duration, ConfigError> {
        positive_duration("pipeline.stage_timeout_seconds", self.stage_timeout_seconds)
            .map_err(ConfigError::ValidationError)
    }

    /// Checks that the settings can be used.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout is not usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stage_timeout().map(|_| ())
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prompt service connection.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Pipeline behavior.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Validates both sections.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service
            .validate()
            .map_err(ConfigError::ValidationError)?;
        self.pipeline.validate()
    }
}
