//! Generation requests submitted to the remote image model.

use super::ImagePayload;
use serde::{Deserialize, Serialize};

/// Output-shape hints forwarded to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputHints {
    /// Aspect ratio such as `"4:3"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    /// Resolution tier such as `"2K"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
}

impl Default for OutputHints {
    fn default() -> Self {
        Self {
            aspect_ratio: Some("4:3".to_string()),
            image_size: Some("2K".to_string()),
        }
    }
}

impl OutputHints {
    /// Hints that leave every choice to the model.
    #[must_use]
    pub fn none() -> Self {
        Self {
            aspect_ratio: None,
            image_size: None,
        }
    }
}

/// One remote image-generation call: ordered reference images plus an
/// instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Reference images in the order the model sees them.
    pub references: Vec<ImagePayload>,
    /// Text instruction.
    pub instruction: String,
    /// Output-shape hints.
    #[serde(default)]
    pub output: OutputHints,
}

impl GenerationRequest {
    /// Returns the leading reference image.
    #[must_use]
    pub fn first_reference(&self) -> Option<&ImagePayload> {
        self.references.first()
    }
}
