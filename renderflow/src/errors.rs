//! Error types for renderflow.
//!
//! Every failure a run can halt on maps to one [`RenderError`] variant, and
//! every variant carries a single user-facing message.

use crate::core::{ItemId, RenderStatus};
use crate::remote::{FailureKind, GenerationError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The main error type for renderflow operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No API credential could be resolved.
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// The remote service rejected the credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limiting persisted after the retry budget was spent.
    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    /// The remote service does not know the requested entity, usually a
    /// credential/project mismatch.
    #[error("Requested entity was not found: {0}")]
    EntityNotFound(String),

    /// Any other remote failure.
    #[error("Remote generation failed: {0}")]
    Remote(String),

    /// The remote call succeeded but returned no image.
    #[error("The model returned no image")]
    EmptyResponse,

    /// A staging run was started without a selected, confirmed product.
    #[error("No confirmed product is selected for staging")]
    NoSelection,

    /// Caller input was rejected before any remote call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The referenced item does not exist in the store.
    #[error("Work item not found: {0}")]
    ItemNotFound(ItemId),

    /// The item cannot be edited in its current state.
    #[error("Work item {id} cannot be edited: {reason}")]
    NotEditable {
        /// The item id.
        id: ItemId,
        /// Why the edit was refused.
        reason: String,
    },

    /// A render status change that the lifecycle forbids.
    #[error("Invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        /// The item id.
        id: ItemId,
        /// Current status.
        from: RenderStatus,
        /// Requested status.
        to: RenderStatus,
    },

    /// A source image could not be acquired.
    #[error("Failed to load image from {source_ref}: {reason}")]
    ImageLoad {
        /// Description of the source.
        source_ref: String,
        /// The reason for failure.
        reason: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Machine-checkable classification of a [`RenderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`RenderError::MissingCredential`].
    MissingCredential,
    /// See [`RenderError::Unauthorized`].
    Unauthorized,
    /// See [`RenderError::QuotaExhausted`].
    QuotaExhausted,
    /// See [`RenderError::EntityNotFound`].
    EntityNotFound,
    /// See [`RenderError::Remote`].
    Remote,
    /// See [`RenderError::EmptyResponse`].
    EmptyResponse,
    /// See [`RenderError::NoSelection`].
    NoSelection,
    /// Input, lookup, lifecycle and configuration failures.
    Invalid,
    /// See [`RenderError::ImageLoad`] and [`RenderError::Io`].
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingCredential => "missing_credential",
            Self::Unauthorized => "unauthorized",
            Self::QuotaExhausted => "quota_exhausted",
            Self::EntityNotFound => "entity_not_found",
            Self::Remote => "remote",
            Self::EmptyResponse => "empty_response",
            Self::NoSelection => "no_selection",
            Self::Invalid => "invalid",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

impl RenderError {
    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential(_) => ErrorKind::MissingCredential,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::QuotaExhausted(_) => ErrorKind::QuotaExhausted,
            Self::EntityNotFound(_) => ErrorKind::EntityNotFound,
            Self::Remote(_) => ErrorKind::Remote,
            Self::EmptyResponse => ErrorKind::EmptyResponse,
            Self::NoSelection => ErrorKind::NoSelection,
            Self::InvalidInput(_)
            | Self::ItemNotFound(_)
            | Self::NotEditable { .. }
            | Self::InvalidTransition { .. }
            | Self::Config(_) => ErrorKind::Invalid,
            Self::ImageLoad { .. } | Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns true if the user must pick or fix an API key before retrying.
    #[must_use]
    pub fn requires_credential_action(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingCredential | ErrorKind::Unauthorized | ErrorKind::EntityNotFound
        )
    }

    /// One-line message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredential(_) => {
                "No API key is configured. Select or provide an API key to start rendering."
                    .to_string()
            }
            Self::Unauthorized(_) => {
                "The API key was rejected. Check that it is valid and has image generation access."
                    .to_string()
            }
            Self::QuotaExhausted(_) => {
                "The image service is rate limiting requests. Wait a moment or check your quota, then try again."
                    .to_string()
            }
            Self::EntityNotFound(_) => {
                "The selected API key does not match an accessible project. Please select your API key again."
                    .to_string()
            }
            Self::Remote(message) => format!("Rendering failed: {message}"),
            Self::EmptyResponse => {
                "The model finished without returning an image. Try again or adjust the parameters."
                    .to_string()
            }
            Self::NoSelection => {
                "Select at least one confirmed product before staging a scene.".to_string()
            }
            Self::InvalidTransition { .. } => {
                "This item is already being rendered. Wait for it to finish, then try again."
                    .to_string()
            }
            other => other.to_string(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map.insert("user_message".to_string(), serde_json::json!(self.user_message()));

        match self {
            Self::ItemNotFound(id) | Self::NotEditable { id, .. } => {
                map.insert("item_id".to_string(), serde_json::json!(id));
            }
            Self::InvalidTransition { id, from, to } => {
                map.insert("item_id".to_string(), serde_json::json!(id));
                map.insert("from".to_string(), serde_json::json!(from));
                map.insert("to".to_string(), serde_json::json!(to));
            }
            _ => {}
        }

        map
    }
}

impl From<GenerationError> for RenderError {
    fn from(err: GenerationError) -> Self {
        match err.kind {
            FailureKind::RateLimited => Self::QuotaExhausted(err.message),
            FailureKind::Unauthorized => Self::Unauthorized(err.message),
            FailureKind::EntityNotFound => Self::EntityNotFound(err.message),
            FailureKind::Other => Self::Remote(err.message),
        }
    }
}
