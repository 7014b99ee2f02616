//! Event sinks.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::Level;
use uuid::Uuid;

/// One emitted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Dotted event name, e.g. `item.completed`.
    pub name: String,
    /// JSON payload.
    pub data: Option<serde_json::Value>,
}

impl Event {
    /// Returns the `run_id` carried in the payload, if any.
    #[must_use]
    pub fn run_id(&self) -> Option<Uuid> {
        self.field("run_id")?.as_str()?.parse().ok()
    }

    /// Returns the `item_id` carried in the payload, if any.
    #[must_use]
    pub fn item_id(&self) -> Option<Uuid> {
        self.field("item_id")?.as_str()?.parse().ok()
    }

    /// Returns a payload field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.as_ref()?.get(key)
    }
}

/// Receives run, item and retry events.
///
/// Sinks must not fail the run: emission errors are the sink's problem.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event.
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>);

    /// Emits an event from synchronous code.
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}

    fn try_emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// Writes events to `tracing`, lifting `run_id` and `item_id` into fields.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl LoggingEventSink {
    /// Creates a sink logging at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a sink logging at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log(&self, event_type: &str, data: Option<serde_json::Value>) {
        let event = Event {
            name: event_type.to_string(),
            data,
        };
        let run_id = event.run_id().map(|id| id.to_string()).unwrap_or_default();
        let item_id = event.item_id().map(|id| id.to_string()).unwrap_or_default();

        if self.level >= Level::DEBUG {
            tracing::debug!(event = %event.name, run_id = %run_id, item_id = %item_id, data = ?event.data, "renderflow event");
        } else {
            tracing::info!(event = %event.name, run_id = %run_id, item_id = %item_id, data = ?event.data, "renderflow event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.log(event_type, data);
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.log(event_type, data);
    }
}

/// Keeps every event in memory, in emission order.
///
/// Backs progress displays and test assertions.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<Event>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Returns the event names in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.name.clone()).collect()
    }

    /// Returns events whose name starts with `prefix`.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<Event> {
        self.events
            .read()
            .iter()
            .filter(|e| e.name.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Returns the events of one run.
    #[must_use]
    pub fn for_run(&self, run_id: Uuid) -> Vec<Event> {
        self.events
            .read()
            .iter()
            .filter(|e| e.run_id() == Some(run_id))
            .cloned()
            .collect()
    }

    /// Returns the most recent event.
    #[must_use]
    pub fn last(&self) -> Option<Event> {
        self.events.read().last().cloned()
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Drops every event.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.try_emit(event_type, data);
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push(Event {
            name: event_type.to_string(),
            data,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_and_logging_sinks_accept_anything() {
        NoOpEventSink.emit("run.started", None).await;
        NoOpEventSink.try_emit("run.started", Some(json!({ "x": 1 })));

        let sink = LoggingEventSink::debug();
        sink.emit("item.completed", Some(json!({ "item_id": "not-a-uuid" }))).await;
        LoggingEventSink::default().try_emit("run.halted", None);
    }

    #[tokio::test]
    async fn test_collecting_sink_keeps_order() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("run.started", None).await;
        sink.try_emit("item.processing", Some(json!({ "index": 0 })));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.event_types(), vec!["run.started", "item.processing"]);
        assert_eq!(sink.last().unwrap().field("index"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn test_collecting_sink_filters() {
        let sink = CollectingEventSink::new();
        let run_a = Uuid::new_v4();
        let run_b = Uuid::new_v4();
        sink.emit("item.processing", Some(json!({ "run_id": run_a }))).await;
        sink.emit("item.completed", Some(json!({ "run_id": run_a }))).await;
        sink.emit("run.completed", Some(json!({ "run_id": run_b }))).await;

        assert_eq!(sink.events_of_type("item.").len(), 2);
        assert_eq!(sink.for_run(run_a).len(), 2);
        assert_eq!(sink.for_run(run_b)[0].name, "run.completed");

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_event_ids() {
        let item = Uuid::new_v4();
        let event = Event {
            name: "item.failed".to_string(),
            data: Some(json!({ "item_id": item, "run_id": 7 })),
        };
        assert_eq!(event.item_id(), Some(item));
        assert_eq!(event.run_id(), None);
    }
}
