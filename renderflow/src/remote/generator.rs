//! The remote image-generation capability.

use super::Credential;
use crate::core::{GenerationRequest, ImagePayload};
use crate::pipeline::Retryable;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Too many requests; eligible for retry.
    RateLimited,
    /// The credential was rejected.
    Unauthorized,
    /// The requested entity (model or project) is unknown to the credential.
    EntityNotFound,
    /// Anything else.
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::EntityNotFound => write!(f, "entity_not_found"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A failed remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct GenerationError {
    /// Classification.
    pub kind: FailureKind,
    /// Underlying message.
    pub message: String,
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
}

impl GenerationError {
    /// Creates a new generation error.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Creates a rate-limited error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RateLimited, message)
    }

    /// Creates an unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unauthorized, message)
    }

    /// Creates an entity-not-found error.
    #[must_use]
    pub fn entity_not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::EntityNotFound, message)
    }

    /// Creates an unclassified error.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }

    /// Sets the HTTP status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        self.kind == FailureKind::RateLimited
    }
}

/// Submits one image-generation request.
///
/// Implementations perform exactly one remote call per invocation and never
/// retry on their own; retry is the caller's concern.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the generator name for logs.
    fn name(&self) -> &str;

    /// Generates an image.
    ///
    /// `Ok(None)` means the call succeeded but carried no image payload.
    async fn generate(
        &self,
        request: &GenerationRequest,
        credential: &Credential,
    ) -> Result<Option<ImagePayload>, GenerationError>;
}
