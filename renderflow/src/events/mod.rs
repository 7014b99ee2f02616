//! Event sink system for observability.
//!
//! The orchestrator and retry policy report progress through an injected
//! [`EventSink`]. Event names are dotted strings; payloads are JSON objects
//! that always carry the `run_id` of the emitting run (retry events carry the
//! request label instead).

mod sink;

pub use sink::{CollectingEventSink, Event, EventSink, LoggingEventSink, NoOpEventSink};

/// A run started.
pub const RUN_STARTED: &str = "run.started";
/// A run finished every item.
pub const RUN_COMPLETED: &str = "run.completed";
/// A run stopped at a failing item.
pub const RUN_HALTED: &str = "run.halted";
/// Scene placeholders were appended to the store.
pub const SCENES_CREATED: &str = "scenes.created";
/// An item's request is about to be submitted.
pub const ITEM_PROCESSING: &str = "item.processing";
/// An item received its output.
pub const ITEM_COMPLETED: &str = "item.completed";
/// An item's request failed.
pub const ITEM_FAILED: &str = "item.failed";
/// An item left in `processing` by a dropped run was marked `error`.
pub const ITEM_ABANDONED: &str = "item.abandoned";
/// A rate-limited request will be retried.
pub const RETRY_SCHEDULED: &str = "retry.scheduled";
