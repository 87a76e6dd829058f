//! Scripted prompt service for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::errors::ServiceError;
use crate::service::{Ack, DataType, InputRef, OutputPayload, PromptService};

/// The four service operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `create_input`
    CreateInput,
    /// `apply_instruction`
    ApplyInstruction,
    /// `fetch_output`
    FetchOutput,
    /// `delete_object`
    DeleteObject,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateInput => write!(f, "create_input"),
            Self::ApplyInstruction => write!(f, "apply_instruction"),
            Self::FetchOutput => write!(f, "fetch_output"),
            Self::DeleteObject => write!(f, "delete_object"),
        }
    }
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// The operation.
    pub operation: Operation,
    /// The object written, read or deleted.
    pub object: String,
    /// Input object names of an apply call.
    pub inputs: Vec<String>,
}

/// An in-memory [`PromptService`] with scripted outputs and failures.
///
/// Created objects are tracked so deleting an object that was never
/// created fails with a 404, like the hosted service.
#[derive(Debug, Default)]
pub struct ScriptedPromptService {
    outputs: Mutex<HashMap<String, Option<String>>>,
    failures: Mutex<HashMap<(Operation, String), ServiceError>>,
    delays: Mutex<HashMap<String, Duration>>,
    created: Mutex<Vec<String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedPromptService {
    /// Creates a service where every call succeeds and fetches return nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `text_value` returned for `object`.
    #[must_use]
    pub fn with_output(self, object: impl Into<String>, text: impl Into<String>) -> Self {
        self.outputs.lock().insert(object.into(), Some(text.into()));
        self
    }

    /// Makes `operation` on `object` fail with `error`.
    #[must_use]
    pub fn with_failure(
        self,
        operation: Operation,
        object: impl Into<String>,
        error: ServiceError,
    ) -> Self {
        self.failures.lock().insert((operation, object.into()), error);
        self
    }

    /// Delays the create or apply call producing `object`.
    #[must_use]
    pub fn with_delay(self, object: impl Into<String>, delay: Duration) -> Self {
        self.delays.lock().insert(object.into(), delay);
        self
    }

    /// All calls so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Objects touched by `operation`, in call order.
    #[must_use]
    pub fn objects_for(&self, operation: Operation) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.operation == operation)
            .map(|c| c.object.clone())
            .collect()
    }

    /// Objects currently held by the service.
    #[must_use]
    pub fn created(&self) -> Vec<String> {
        self.created.lock().clone()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    async fn call(
        &self,
        operation: Operation,
        object: &str,
        inputs: Vec<String>,
    ) -> Result<(), ServiceError> {
        self.calls.lock().push(RecordedCall {
            operation,
            object: object.to_string(),
            inputs,
        });

        if matches!(operation, Operation::CreateInput | Operation::ApplyInstruction) {
            let delay = self.delays.lock().get(object).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }

        let failure = self
            .failures
            .lock()
            .get(&(operation, object.to_string()))
            .cloned();
        failure.map_or(Ok(()), Err)
    }

    fn mark_created(&self, object: &str) {
        let mut created = self.created.lock();
        if !created.iter().any(|o| o == object) {
            created.push(object.to_string());
        }
    }
}

#[async_trait]
impl PromptService for ScriptedPromptService {
    async fn create_input(
        &self,
        object_name: &str,
        _data_type: DataType,
        _content: &[String],
    ) -> Result<Ack, ServiceError> {
        self.call(Operation::CreateInput, object_name, Vec::new()).await?;
        self.mark_created(object_name);
        Ok(json!({"created_object_name": object_name}))
    }

    async fn apply_instruction(
        &self,
        outputs: &[String],
        _instruction: &str,
        inputs: &[InputRef],
    ) -> Result<Ack, ServiceError> {
        let object = outputs.first().map(String::as_str).unwrap_or_default();
        let names = inputs.iter().map(|i| i.name.clone()).collect();
        self.call(Operation::ApplyInstruction, object, names).await?;
        for output in outputs {
            self.mark_created(output);
        }
        Ok(json!({"created_object_names": outputs}))
    }

    async fn fetch_output(&self, object_name: &str) -> Result<OutputPayload, ServiceError> {
        self.call(Operation::FetchOutput, object_name, Vec::new()).await?;
        Ok(OutputPayload {
            text_value: self.outputs.lock().get(object_name).cloned().flatten(),
        })
    }

    async fn delete_object(&self, object_name: &str) -> Result<Ack, ServiceError> {
        self.call(Operation::DeleteObject, object_name, Vec::new()).await?;
        let mut created = self.created.lock();
        let Some(pos) = created.iter().position(|o| o == object_name) else {
            return Err(ServiceError::status(404, format!("object '{object_name}' not found")));
        };
        created.remove(pos);
        Ok(json!({"deleted": object_name}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_and_outputs() {
        let service = ScriptedPromptService::new().with_output("summary", r#"{"a": 1}"#);

        service
            .create_input("data", DataType::Strings, &["x".to_string()])
            .await
            .unwrap();
        service
            .apply_instruction(&["summary".to_string()], "{data}", &[InputRef::combined("data")])
            .await
            .unwrap();
        let payload = service.fetch_output("summary").await.unwrap();
        let missing = service.fetch_output("other").await.unwrap();

        assert_eq!(payload.text_value.as_deref(), Some(r#"{"a": 1}"#));
        assert_eq!(missing.text_value, None);
        assert_eq!(service.call_count(), 4);
        assert_eq!(service.calls()[1].inputs, vec!["data".to_string()]);
        assert_eq!(service.created(), vec!["data", "summary"]);
    }

    #[tokio::test]
    async fn test_scripted_failure_and_not_found() {
        let service = ScriptedPromptService::new().with_failure(
            Operation::ApplyInstruction,
            "risk",
            ServiceError::status(500, "boom"),
        );

        let err = service
            .apply_instruction(&["risk".to_string()], "x", &[])
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::status(500, "boom"));
        assert!(service.created().is_empty());

        let err = service.delete_object("risk").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(service.objects_for(Operation::DeleteObject), vec!["risk"]);

        service.clear_calls();
        assert_eq!(service.call_count(), 0);
    }
}
