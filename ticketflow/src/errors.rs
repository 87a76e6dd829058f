//! Error types for the ticketflow pipeline.
//!
//! Library code returns [`TicketflowError`]; stage-level failures carry the
//! [`StageId`] that triggered them so callers can tell the user which step of
//! the analysis broke.

use crate::core::{StageId, StageStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for ticketflow operations.
#[derive(Debug, Error)]
pub enum TicketflowError {
    /// The uploaded file was rejected before any remote call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stage failed and the run was aborted.
    #[error("{0}")]
    Stage(#[from] StageError),

    /// The pipeline definition is invalid.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A state change would break stage ordering or monotonicity.
    #[error("{0}")]
    InvalidTransition(#[from] TransitionError),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A run is already in progress on this session.
    #[error("A pipeline run is already in progress")]
    RunInProgress,

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TicketflowError {
    /// Returns the stage that triggered the error, if any.
    #[must_use]
    pub fn stage(&self) -> Option<StageId> {
        match self {
            Self::Stage(err) => Some(err.stage),
            _ => None,
        }
    }
}

/// Errors returned by the remote prompt service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("service returned HTTP {code}: {body}")]
    Status {
        /// The HTTP status code.
        code: u16,
        /// The response body, possibly truncated.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Creates a status error.
    #[must_use]
    pub fn status(code: u16, body: impl Into<String>) -> Self {
        Self::Status {
            code,
            body: body.into(),
        }
    }

    /// Returns true for a 404 response.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { code: 404, .. })
    }
}

/// Why a stage failed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StageErrorKind {
    /// The remote call errored.
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// The remote call did not answer in time.
    #[error("timed out after {seconds}s")]
    Timeout {
        /// The timeout that expired.
        seconds: f64,
    },

    /// The stage output was not the JSON shape the stage expects.
    #[error("invalid payload: {0}")]
    Payload(String),
}

/// A failure attributed to one pipeline stage.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Stage '{stage}' failed: {kind}")]
pub struct StageError {
    /// The stage that failed.
    pub stage: StageId,
    /// The failure cause.
    pub kind: StageErrorKind,
}

impl StageError {
    /// Creates a new stage error.
    #[must_use]
    pub fn new(stage: StageId, kind: impl Into<StageErrorKind>) -> Self {
        Self {
            stage,
            kind: kind.into(),
        }
    }

    /// Creates a timeout error for a stage.
    #[must_use]
    pub fn timeout(stage: StageId, seconds: f64) -> Self {
        Self::new(stage, StageErrorKind::Timeout { seconds })
    }

    /// Creates a payload error for a stage.
    #[must_use]
    pub fn payload(stage: StageId, message: impl Into<String>) -> Self {
        Self::new(stage, StageErrorKind::Payload(message.into()))
    }

    /// The message shown to the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        format!("Analysis failed: {} ({})", self.kind, self.stage.title())
    }
}

/// Error raised when a stage status change is not allowed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// The status would move backwards or skip a step.
    #[error("Stage '{stage}' cannot move from {from} to {to}")]
    NotAllowed {
        /// The stage.
        stage: StageId,
        /// Current status.
        from: StageStatus,
        /// Requested status.
        to: StageStatus,
    },

    /// A declared dependency has not completed yet.
    #[error("Stage '{stage}' cannot start before '{dependency}' is done")]
    DependencyPending {
        /// The stage that tried to start.
        stage: StageId,
        /// The dependency that is not done.
        dependency: StageId,
    },

    /// The stage is not part of the tracked pipeline.
    #[error("Stage '{0}' is not part of this pipeline")]
    UnknownStage(StageId),
}

/// Metadata about a pipeline definition error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "PIPELINE-UNKNOWN-INPUT").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<StageId>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<StageId>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if one was attached.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}
