//! Render and input status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The render lifecycle of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    /// Created, no request submitted yet.
    #[default]
    Pending,
    /// A request for this item is in flight.
    Processing,
    /// The item holds a rendered output.
    Completed,
    /// The last request for this item failed.
    Error,
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl RenderStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns true if a transition from `self` to `next` is allowed.
    ///
    /// Terminal states may re-enter `Processing` (an edit, or a new explicit
    /// run for errored items). Nothing moves back to `Pending`.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Processing)
            | (Self::Processing, Self::Completed | Self::Error)
            | (Self::Completed | Self::Error, Self::Processing) => true,
            _ => false,
        }
    }
}

/// Lifecycle of an imported product photo, owned by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputStatus {
    /// Added but not yet reviewed.
    #[default]
    Imported,
    /// Reviewed and eligible for rendering.
    Confirmed,
    /// Removed by the user.
    Removed,
    /// Superseded by a newer upload.
    Replaced,
}

impl fmt::Display for InputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imported => write!(f, "imported"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Removed => write!(f, "removed"),
            Self::Replaced => write!(f, "replaced"),
        }
    }
}
