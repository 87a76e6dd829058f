//! Connection settings for the prompt service.

use serde::{Deserialize, Serialize};
use crate::utils::positive_duration;
use std::fmt;
use std::time::Duration;

/// Configuration for the hosted prompt service.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the API, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer credential.
    #[serde(default)]
    pub api_key: String,
    /// Value of the `X-Generated-App-ID` header.
    #[serde(default)]
    pub app_id: String,
    /// Value of the `X-Usage-Key` header.
    #[serde(default)]
    pub usage_key: String,
    /// Connect timeout for the HTTP client in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: f64,
}

fn default_base_url() -> String {
    "https://builder.empromptu.ai/api_tools".to_string()
}

fn default_connect_timeout() -> f64 {
    10.0
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            app_id: String::new(),
            usage_key: String::new(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl ServiceConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the three credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        api_key: impl Into<String>,
        app_id: impl Into<String>,
        usage_key: impl Into<String>,
    ) -> Self {
        self.api_key = api_key.into();
        self.app_id = app_id.into();
        self.usage_key = usage_key.into();
        self
    }

    /// Joins `path` onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// The HTTP connect timeout as a duration.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem unless the timeout is a positive
    /// number of seconds that fits in a [`Duration`].
    pub fn connect_timeout(&self) -> Result<Duration, String> {
        positive_duration("service.connect_timeout_seconds", self.connect_timeout_seconds)
    }

    /// Checks that the settings can be used.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("service.base_url must not be empty".to_string());
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!("service.base_url '{}' is not an http(s) URL", self.base_url));
        }
        if self.api_key.trim().is_empty() {
            return Err("service.api_key must be set".to_string());
        }
        self.connect_timeout().map(|_| ())
    }
}

// Credentials stay out of logs.
impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("app_id", &self.app_id)
            .field("usage_key", &redact(&self.usage_key))
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let config = ServiceConfig::new().with_base_url("https://example.test/api/");
        assert_eq!(config.endpoint("/input_data"), "https://example.test/api/input_data");
        assert_eq!(
            config.endpoint("return_data/summary"),
            "https://example.test/api/return_data/summary"
        );
    }

    #[test]
    fn test_validate() {
        assert!(ServiceConfig::new().validate().is_err());

        let config = ServiceConfig::new().with_credentials("key", "app", "usage");
        assert!(config.validate().is_ok());

        let config = config.with_base_url("ftp://nope");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_connect_timeout() {
        let mut config = ServiceConfig::new().with_credentials("key", "app", "usage");
        for seconds in [0.0, -3.0, f64::NAN, f64::INFINITY, 1e20] {
            config.connect_timeout_seconds = seconds;
            let err = config.validate().unwrap_err();
            assert!(err.contains("connect_timeout_seconds"), "{seconds}: {err}");
        }
        config.connect_timeout_seconds = 2.5;
        assert_eq!(config.connect_timeout(), Ok(Duration::from_millis(2500)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ServiceConfig::new().with_credentials("secret-key", "app", "secret-usage");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(!debug.contains("secret-usage"));
        assert!(debug.contains("<redacted>"));
    }
}
