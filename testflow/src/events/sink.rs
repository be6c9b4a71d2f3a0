//! Where harness lifecycle events go.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

/// Receives harness lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers an event, awaiting the sink if it needs to.
    ///
    /// `event_type` is one of the names in [`super::event_types`].
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>);

    /// Emits an event without awaiting.
    ///
    /// Must never fail; a sink that cannot deliver drops the event.
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}

    fn try_emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// Forwards events to `tracing`.
///
/// Events go out at `DEBUG` unless the sink is [`LoggingEventSink::verbose`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventSink {
    verbose: bool,
}

impl LoggingEventSink {
    /// A sink that logs events at `DEBUG`.
    #[must_use]
    pub fn debug() -> Self {
        Self { verbose: false }
    }

    /// A sink that logs events at `INFO`.
    #[must_use]
    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.try_emit(event_type, data);
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        let data = data.unwrap_or(serde_json::Value::Null);
        if self.verbose {
            info!(event = event_type, %data, "harness event");
        } else {
            debug!(event = event_type, %data, "harness event");
        }
    }
}

/// One event captured by a [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Event type name.
    pub event_type: String,
    /// Payload, `Null` when none was sent.
    pub data: serde_json::Value,
}

/// Keeps every event in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    recorded: RwLock<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.recorded.read().to_vec()
    }

    /// Event type names in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.recorded
            .read()
            .iter()
            .map(|event| event.event_type.clone())
            .collect()
    }

    /// Recorded events whose type begins with `prefix` (`"stage."` matches
    /// every stage event).
    #[must_use]
    pub fn with_prefix(&self, prefix: &str) -> Vec<RecordedEvent> {
        let recorded = self.recorded.read();
        recorded
            .iter()
            .filter(|event| event.event_type.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recorded.read().len()
    }

    /// True before anything was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.try_emit(event_type, data);
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.recorded.write().push(RecordedEvent {
            event_type: event_type.to_owned(),
            data: data.unwrap_or_default(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_and_logging_sinks_accept_anything() {
        NoOpEventSink.emit("run.started", None).await;
        NoOpEventSink.try_emit("stage.failed", Some(json!({ "status": 1 })));

        let sink = LoggingEventSink::verbose();
        sink.emit("stage.started", Some(json!({ "stage": "unit-tests" }))).await;
        LoggingEventSink::debug().try_emit("run.completed", None);
    }

    #[tokio::test]
    async fn test_collecting_sink_keeps_order_and_payloads() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("stage.started", None).await;
        sink.try_emit("stage.failed", Some(json!({ "status": 2 })));
        sink.try_emit("run.completed", None);

        assert_eq!(sink.len(), 3);
        assert_eq!(
            sink.event_types(),
            vec!["stage.started", "stage.failed", "run.completed"]
        );

        let stage_events = sink.with_prefix("stage.");
        assert_eq!(stage_events.len(), 2);
        assert_eq!(stage_events[0].data, serde_json::Value::Null);
        assert_eq!(stage_events[1].data["status"], 2);
    }
}
