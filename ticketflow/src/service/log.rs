//! Recording of every call made to the prompt service.

use super::{Ack, DataType, InputRef, OutputPayload, PromptService};
use crate::errors::ServiceError;
use crate::utils::iso_timestamp;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// One recorded service call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCallRecord {
    /// When the call finished (ISO 8601).
    pub timestamp: String,
    /// Endpoint path, e.g. `/apply_prompt`.
    pub endpoint: String,
    /// HTTP method.
    pub method: String,
    /// Request body, if any.
    #[serde(default)]
    pub payload: Option<Value>,
    /// Response body, or `{"error": ...}` on failure.
    pub response: Value,
}

impl ApiCallRecord {
    /// Whether the call failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.response.get("error").is_some()
    }
}

/// Shared, append-only log of service calls for one session.
#[derive(Debug, Clone, Default)]
pub struct ApiCallLog {
    records: Arc<RwLock<Vec<ApiCallRecord>>>,
}

impl ApiCallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn push(&self, record: ApiCallRecord) {
        self.records.write().push(record);
    }

    /// Returns a copy of all records.
    #[must_use]
    pub fn records(&self) -> Vec<ApiCallRecord> {
        self.records.read().clone()
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Drops all records.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    fn record<T: Serialize>(
        &self,
        endpoint: String,
        method: &str,
        payload: Option<Value>,
        result: &Result<T, ServiceError>,
    ) {
        let response = match result {
            Ok(body) => serde_json::to_value(body).unwrap_or(Value::Null),
            Err(err) => {
                warn!(endpoint = %endpoint, method, error = %err, "service call failed");
                json!({ "error": err.to_string() })
            }
        };
        debug!(endpoint = %endpoint, method, "service call recorded");
        self.push(ApiCallRecord {
            timestamp: iso_timestamp(),
            endpoint,
            method: method.to_string(),
            payload,
            response,
        });
    }
}

/// Wraps a [`PromptService`] and records every call in an [`ApiCallLog`].
pub struct LoggedService {
    inner: Arc<dyn PromptService>,
    log: ApiCallLog,
}

impl LoggedService {
    /// Wraps `inner`, recording into `log`.
    #[must_use]
    pub fn new(inner: Arc<dyn PromptService>, log: ApiCallLog) -> Self {
        Self { inner, log }
    }

    /// The log calls are recorded into.
    #[must_use]
    pub fn log(&self) -> &ApiCallLog {
        &self.log
    }
}

impl std::fmt::Debug for LoggedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggedService")
            .field("recorded", &self.log.len())
            .finish()
    }
}

#[async_trait]
impl PromptService for LoggedService {
    async fn create_input(
        &self,
        object_name: &str,
        data_type: DataType,
        content: &[String],
    ) -> Result<Ack, ServiceError> {
        let result = self.inner.create_input(object_name, data_type, content).await;
        // The CSV body can be large; the log keeps its size, not its text.
        let payload = json!({
            "created_object_name": object_name,
            "data_type": data_type,
            "input_data_bytes": content.iter().map(String::len).sum::<usize>(),
        });
        self.log.record("/input_data".to_string(), "POST", Some(payload), &result);
        result
    }

    async fn apply_instruction(
        &self,
        outputs: &[String],
        instruction: &str,
        inputs: &[InputRef],
    ) -> Result<Ack, ServiceError> {
        let result = self.inner.apply_instruction(outputs, instruction, inputs).await;
        let payload = json!({
            "created_object_names": outputs,
            "prompt_string": instruction,
            "inputs": inputs,
        });
        self.log.record("/apply_prompt".to_string(), "POST", Some(payload), &result);
        result
    }

    async fn fetch_output(&self, object_name: &str) -> Result<OutputPayload, ServiceError> {
        let result = self.inner.fetch_output(object_name).await;
        self.log
            .record(format!("/return_data/{object_name}"), "GET", None, &result);
        result
    }

    async fn delete_object(&self, object_name: &str) -> Result<Ack, ServiceError> {
        let result = self.inner.delete_object(object_name).await;
        self.log
            .record(format!("/objects/{object_name}"), "DELETE", None, &result);
        result
    }
}
