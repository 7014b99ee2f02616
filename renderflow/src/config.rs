//! Configuration for renderflow.

use crate::core::OutputHints;
use crate::errors::RenderError;
use crate::observability::LogFormat;
use crate::pipeline::RetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderflowConfig {
    /// Image model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// REST API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: f64,
    /// Environment variables searched for the API key, in order.
    #[serde(default = "default_credential_env_vars")]
    pub credential_env_vars: Vec<String>,
    /// Largest accepted source image in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    /// Output-shape hints attached to every request.
    #[serde(default)]
    pub output: OutputHints,
    /// Retry configuration for rate-limited calls.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_model() -> String {
    "gemini-3-pro-image-preview".to_string()
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_timeout() -> f64 {
    120.0
}

fn default_credential_env_vars() -> Vec<String> {
    vec!["GEMINI_API_KEY".to_string(), "API_KEY".to_string()]
}

fn default_max_image_bytes() -> usize {
    20 * 1024 * 1024 // 20MB
}

impl Default for RenderflowConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base_url: default_api_base_url(),
            request_timeout_seconds: default_timeout(),
            credential_env_vars: default_credential_env_vars(),
            max_image_bytes: default_max_image_bytes(),
            output: OutputHints::default(),
            retry: RetryConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl RenderflowConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, RenderError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RenderError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `RENDERFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, RenderError> {
        Self::default().overlay_env(|key| std::env::var(key).ok())
    }

    /// Overlays values from `lookup`, keyed by `RENDERFLOW_*` names.
    pub fn overlay_env<F>(mut self, lookup: F) -> Result<Self, RenderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("RENDERFLOW_MODEL") {
            self.model = model;
        }
        if let Some(url) = lookup("RENDERFLOW_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(timeout) = lookup("RENDERFLOW_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = parse_var("RENDERFLOW_TIMEOUT_SECONDS", &timeout)?;
        }
        if let Some(retries) = lookup("RENDERFLOW_MAX_RETRIES") {
            self.retry.max_retries = parse_var("RENDERFLOW_MAX_RETRIES", &retries)?;
        }
        if let Some(delay) = lookup("RENDERFLOW_RETRY_DELAY_MS") {
            self.retry.initial_delay_ms = parse_var("RENDERFLOW_RETRY_DELAY_MS", &delay)?;
        }
        if let Some(ratio) = lookup("RENDERFLOW_ASPECT_RATIO") {
            self.output.aspect_ratio = Some(ratio).filter(|r| !r.is_empty());
        }
        if let Some(size) = lookup("RENDERFLOW_IMAGE_SIZE") {
            self.output.image_size = Some(size).filter(|s| !s.is_empty());
        }
        if let Some(format) = lookup("RENDERFLOW_LOG_FORMAT") {
            self.log_format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                other => {
                    return Err(RenderError::Config(format!(
                        "RENDERFLOW_LOG_FORMAT must be 'json' or 'pretty', got '{other}'"
                    )))
                }
            };
        }

        self.validate()?;
        Ok(self)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.model.trim().is_empty() {
            return Err(RenderError::Config("model must not be empty".to_string()));
        }
        if !self.request_timeout_seconds.is_finite() || self.request_timeout_seconds <= 0.0 {
            return Err(RenderError::Config(
                "request_timeout_seconds must be positive".to_string(),
            ));
        }
        if self.credential_env_vars.is_empty() {
            return Err(RenderError::Config(
                "credential_env_vars must name at least one variable".to_string(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(RenderError::Config(
                "retry.max_delay_ms must not be below retry.initial_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the output hints.
    #[must_use]
    pub fn with_output(mut self, output: OutputHints) -> Self {
        self.output = output;
        self
    }

    /// Gets the request timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_seconds)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, RenderError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RenderError::Config(format!("{name}='{value}': {e}")))
}
