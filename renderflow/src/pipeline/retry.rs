//! Retry policy with bounded exponential backoff.
//!
//! Only failures that report themselves as retryable (rate limiting) are
//! retried. Everything else, and the final rate-limit failure once the budget
//! is spent, is returned to the caller unchanged.

use crate::events::{EventSink, NoOpEventSink};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Classifies a failure for the retry policy.
pub trait Retryable {
    /// Returns true if the failure is transient and worth retrying.
    fn is_retryable(&self) -> bool;
}

/// Configuration for retry behavior.
///
/// Delays grow as `initial_delay_ms * 2^attempt`, capped at `max_delay_ms`,
/// with no jitter. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Maximum retries after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay_ms(mut self, delay: u64) -> Self {
        self.initial_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Returns the delay before retry number `attempt` (0-indexed).
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// State tracking for one retried operation.
#[derive(Debug, Default, Clone)]
pub struct RetryState {
    /// Retries performed so far.
    pub attempt: u32,
    /// Sum of all delays slept so far.
    pub total_delay: Duration,
}

impl RetryState {
    /// Creates a new retry state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the delay for the current attempt.
    #[must_use]
    pub fn calculate_delay(&self, config: &RetryConfig) -> Duration {
        config.base_delay(self.attempt)
    }

    /// Returns true if the retry budget is spent.
    #[must_use]
    pub fn is_exhausted(&self, config: &RetryConfig) -> bool {
        self.attempt >= config.max_retries
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// Retryable, but the budget is spent.
    GiveUp,
    /// Don't retry, the error is not retryable.
    NotRetryable,
}

/// Makes a retry decision for `error` and advances the state on retry.
#[must_use]
pub fn should_retry<E: Retryable>(
    state: &mut RetryState,
    config: &RetryConfig,
    error: &E,
) -> RetryDecision {
    if !error.is_retryable() {
        return RetryDecision::NotRetryable;
    }
    if state.is_exhausted(config) {
        return RetryDecision::GiveUp;
    }

    let delay = state.calculate_delay(config);
    state.attempt += 1;
    state.total_delay += delay;

    RetryDecision::Retry(delay)
}

/// Executes an operation with retry logic.
///
/// The operation is invoked at most `config.max_retries + 1` times.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    label: &str,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    RetryPolicy::new(config.clone()).execute(label, operation).await
}

/// Reusable retry policy shared by every request kind.
#[derive(Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Creates a new retry policy.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink that receives `retry.scheduled` events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `operation`, retrying retryable failures with backoff.
    pub async fn execute<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut state = RetryState::new();

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => match should_retry(&mut state, &self.config, &e) {
                    RetryDecision::Retry(delay) => {
                        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                        tracing::warn!(
                            label = %label,
                            attempt = state.attempt,
                            max_retries = self.config.max_retries,
                            delay_ms,
                            error = %e,
                            "Rate limited, retrying after backoff"
                        );
                        self.events.try_emit(
                            crate::events::RETRY_SCHEDULED,
                            Some(serde_json::json!({
                                "label": label,
                                "attempt": state.attempt,
                                "delay_ms": delay_ms,
                                "error": e.to_string(),
                            })),
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::GiveUp => {
                        tracing::warn!(
                            label = %label,
                            retries = state.attempt,
                            error = %e,
                            "Retry budget exhausted"
                        );
                        return Err(e);
                    }
                    RetryDecision::NotRetryable => return Err(e),
                },
            }
        }
    }
}
