//! Render pipeline execution.
//!
//! This module provides:
//! - The retry policy wrapped around every remote call
//! - The render orchestrator (independent, staging and edit flows)
//! - Run reports and run failures

mod orchestrator;
mod report;
mod retry;

#[cfg(test)]
mod integration_tests;

pub use orchestrator::RenderOrchestrator;
pub use report::{RunFailure, RunMode, RunReport};
pub use retry::{
    should_retry, with_retry, RetryConfig, RetryDecision, RetryPolicy, RetryState, Retryable,
};
