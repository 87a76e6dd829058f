//! The remote prompt-execution service.
//!
//! The pipeline only depends on the [`PromptService`] trait, which mirrors the
//! four operations the hosted API exposes. [`HttpPromptService`] talks to the
//! real endpoint; [`LoggedService`] wraps any implementation and records each
//! call for the raw-data view.

mod config;
#[cfg(feature = "http")]
mod http;
mod log;

pub use config::ServiceConfig;
#[cfg(feature = "http")]
pub use http::HttpPromptService;
pub use log::{ApiCallLog, ApiCallRecord, LoggedService};

use crate::errors::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Acknowledgement body returned by mutating calls.
pub type Ack = serde_json::Value;

/// How `create_input` content should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// A list of opaque strings.
    #[default]
    Strings,
}

/// How an input object is fed to an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Combine all available records of the object.
    #[default]
    CombineEvents,
}

/// A named object read by an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRef {
    /// The remote object name.
    #[serde(rename = "input_object_name")]
    pub name: String,
    /// How its records are combined.
    pub mode: InputMode,
}

impl InputRef {
    /// Creates an input reference in `combine_events` mode.
    #[must_use]
    pub fn combined(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: InputMode::CombineEvents,
        }
    }
}

/// Body of `fetch_output`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPayload {
    /// JSON-encoded stage output; absent when the service has nothing.
    #[serde(default)]
    pub text_value: Option<String>,
}

impl OutputPayload {
    /// A payload carrying `text`.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text_value: Some(text.into()),
        }
    }
}

/// The operations of the hosted prompt-execution API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PromptService: Send + Sync {
    /// Stores `content` under `object_name`.
    async fn create_input(
        &self,
        object_name: &str,
        data_type: DataType,
        content: &[String],
    ) -> Result<Ack, ServiceError>;

    /// Applies a natural-language instruction to `inputs`, writing `outputs`.
    ///
    /// The instruction embeds `{object_name}` placeholders for its inputs.
    async fn apply_instruction(
        &self,
        outputs: &[String],
        instruction: &str,
        inputs: &[InputRef],
    ) -> Result<Ack, ServiceError>;

    /// Reads back the stored output of an object.
    async fn fetch_output(&self, object_name: &str) -> Result<OutputPayload, ServiceError>;

    /// Deletes a named object.
    async fn delete_object(&self, object_name: &str) -> Result<Ack, ServiceError>;
}
