//! Structured event sink
//!
//! The pool reports its decision points (construction, worker start/stop,
//! scaling decisions, stats snapshots) through an injected [`EventSink`]
//! rather than a process-wide logging global. The sink's own filtering,
//! formatting and output behavior is entirely up to the implementation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

/// Event severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// One structured event emitted at a pool decision point.
#[derive(Debug, Clone, Serialize)]
pub struct PoolEvent {
    pub severity: Severity,
    /// Component that produced the event, e.g. `"pool"` or `"scaler"`.
    pub component: &'static str,
    /// Operation within the component, e.g. `"scale_worker"`.
    pub operation: &'static str,
    pub message: String,
    /// Structured key-value payload.
    pub fields: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl PoolEvent {
    pub fn new(
        severity: Severity,
        component: &'static str,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            component,
            operation,
            message: message.into(),
            fields: Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach a key-value pair to the payload.
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

/// Consumer of pool events.
///
/// Implementations must be cheap and non-blocking: `emit` is called from
/// worker loops and the scaling controller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PoolEvent);
}

/// Default sink: forwards events to the `tracing` macros at the matching
/// level, with the payload serialized into a single field.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PoolEvent) {
        let fields = Value::Object(event.fields);
        match event.severity {
            Severity::Debug => debug!(
                component = event.component,
                operation = event.operation,
                %fields,
                "{}",
                event.message
            ),
            Severity::Info => info!(
                component = event.component,
                operation = event.operation,
                %fields,
                "{}",
                event.message
            ),
            Severity::Warn => warn!(
                component = event.component,
                operation = event.operation,
                %fields,
                "{}",
                event.message
            ),
            Severity::Error => error!(
                component = event.component,
                operation = event.operation,
                %fields,
                "{}",
                event.message
            ),
        }
    }
}

/// Sink that discards all events.
#[derive(Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: PoolEvent) {}
}

/// In-memory sink for tests: captures every emitted event.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PoolEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all captured events, in emission order.
    pub fn events(&self) -> Vec<PoolEvent> {
        self.events.lock().clone()
    }

    /// Captured events matching `operation`.
    pub fn events_for(&self, operation: &str) -> Vec<PoolEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.operation == operation)
            .cloned()
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: PoolEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_builder() {
        let event = PoolEvent::new(Severity::Info, "pool", "scale_worker", "scaling")
            .with_field("desired", 4)
            .with_field("current", json!(2));

        assert_eq!(event.severity, Severity::Info);
        assert_eq!(event.fields["desired"], json!(4));
        assert_eq!(event.fields["current"], json!(2));
    }

    #[test]
    fn test_memory_sink_captures() {
        let sink = MemorySink::new();
        sink.emit(PoolEvent::new(Severity::Debug, "pool", "start_worker", ""));
        sink.emit(PoolEvent::new(Severity::Debug, "pool", "stop_worker", ""));
        sink.emit(PoolEvent::new(Severity::Debug, "pool", "start_worker", ""));

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.events_for("start_worker").len(), 2);
        assert_eq!(sink.events_for("stop_worker").len(), 1);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Warn < Severity::Error);
    }
}
