//! reqwest-backed client for the hosted prompt service.

use super::{Ack, DataType, InputRef, OutputPayload, PromptService, ServiceConfig};
use crate::errors::ServiceError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;

/// Longest error body kept in a [`ServiceError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct InputDataRequest<'a> {
    created_object_name: &'a str,
    data_type: DataType,
    input_data: &'a [String],
}

#[derive(Serialize)]
struct ApplyPromptRequest<'a> {
    created_object_names: &'a [String],
    prompt_string: &'a str,
    inputs: &'a [InputRef],
}

/// HTTP implementation of [`PromptService`].
#[derive(Debug, Clone)]
pub struct HttpPromptService {
    client: Client,
    config: ServiceConfig,
}

impl HttpPromptService {
    /// Builds a client that sends the four fixed headers on every request.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential is not a valid header value, the
    /// connect timeout is unusable, or the client cannot be built.
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", config.api_key))?,
        );
        headers.insert(
            HeaderName::from_static("x-generated-app-id"),
            header_value(&config.app_id)?,
        );
        headers.insert(
            HeaderName::from_static("x-usage-key"),
            header_value(&config.usage_key)?,
        );

        let connect_timeout = config.connect_timeout().map_err(ServiceError::Transport)?;
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    async fn check(response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        Err(ServiceError::status(status.as_u16(), body))
    }

    // Acknowledgement bodies are informational; a non-JSON body is kept as a string.
    async fn ack(response: Response) -> Result<Ack, ServiceError> {
        let text = Self::check(response)
            .await?
            .text()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ServiceError> {
    HeaderValue::from_str(value)
        .map_err(|e| ServiceError::Transport(format!("invalid header value: {e}")))
}

fn transport(err: reqwest::Error) -> ServiceError {
    ServiceError::Transport(err.to_string())
}

#[async_trait]
impl PromptService for HttpPromptService {
    async fn create_input(
        &self,
        object_name: &str,
        data_type: DataType,
        content: &[String],
    ) -> Result<Ack, ServiceError> {
        let url = self.config.endpoint("input_data");
        debug!(%url, object = object_name, "POST input_data");
        let body = InputDataRequest {
            created_object_name: object_name,
            data_type,
            input_data: content,
        };
        let response = self.client.post(url).json(&body).send().await.map_err(transport)?;
        Self::ack(response).await
    }

    async fn apply_instruction(
        &self,
        outputs: &[String],
        instruction: &str,
        inputs: &[InputRef],
    ) -> Result<Ack, ServiceError> {
        let url = self.config.endpoint("apply_prompt");
        debug!(%url, outputs = ?outputs, "POST apply_prompt");
        let body = ApplyPromptRequest {
            created_object_names: outputs,
            prompt_string: instruction,
            inputs,
        };
        let response = self.client.post(url).json(&body).send().await.map_err(transport)?;
        Self::ack(response).await
    }

    async fn fetch_output(&self, object_name: &str) -> Result<OutputPayload, ServiceError> {
        let url = self.config.endpoint(&format!("return_data/{object_name}"));
        debug!(%url, "GET return_data");
        let response = self.client.get(url).send().await.map_err(transport)?;
        Self::check(response)
            .await?
            .json::<OutputPayload>()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn delete_object(&self, object_name: &str) -> Result<Ack, ServiceError> {
        let url = self.config.endpoint(&format!("objects/{object_name}"));
        debug!(%url, "DELETE objects");
        let response = self.client.delete(url).send().await.map_err(transport)?;
        Self::ack(response).await
    }
}
