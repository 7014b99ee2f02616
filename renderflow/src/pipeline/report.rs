//! Run outcomes.

use crate::core::ItemId;
use crate::errors::RenderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Which orchestration flow produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One request per confirmed product.
    Independent,
    /// Master shot plus dependent angles.
    Staging,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Independent => write!(f, "independent"),
            Self::Staging => write!(f, "staging"),
        }
    }
}

/// Summary of one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Tags every event and log line of the run.
    pub run_id: Uuid,
    /// Flow that ran.
    pub mode: RunMode,
    /// Items moved to `processing`, in order.
    pub processed: Vec<ItemId>,
    /// Items that reached `completed`, in order.
    pub completed: Vec<ItemId>,
    /// Scene items created by a staging run, in angle order.
    pub created_scenes: Vec<ItemId>,
    /// Master scene of a staging run.
    pub master_id: Option<ItemId>,
    /// Run start time.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl RunReport {
    pub(crate) fn new(mode: RunMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            processed: Vec::new(),
            completed: Vec::new(),
            created_scenes: Vec::new(),
            master_id: None,
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Returns true if every processed item completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.processed.len() == self.completed.len()
    }

    /// Returns true if the run had nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}

/// A run that halted. Items completed before the halt keep their results.
#[derive(Debug, Error)]
#[error("run {} halted: {error}", .report.run_id)]
pub struct RunFailure {
    /// Why the run halted.
    #[source]
    pub error: RenderError,
    /// The item being processed when the run halted, if any.
    pub item_id: Option<ItemId>,
    /// Progress made before the halt.
    pub report: RunReport,
}

impl RunFailure {
    /// One-line message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.error.user_message()
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.report.run_id,
            "mode": self.report.mode,
            "item_id": self.item_id,
            "completed": self.report.completed,
            "error": self.error.to_dict(),
        })
    }
}
