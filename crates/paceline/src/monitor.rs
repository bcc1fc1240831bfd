//! Periodic trace reporting
//!
//! Flushes a shared [`TraceRecorder`] on an interval and reports per-label
//! statistics through the event sink. The loop is cancellable so tests can
//! tear it down deterministically.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use paceline_telemetry::{Stats, TraceRecorder};

use crate::events::{EventSink, PoolEvent, Severity};

/// Periodic reporter over a shared [`TraceRecorder`].
pub struct TraceReporter {
    recorder: Arc<TraceRecorder>,
    interval: Duration,
    sink: Arc<dyn EventSink>,
    shutdown: CancellationToken,
}

impl TraceReporter {
    pub fn new(recorder: Arc<TraceRecorder>, interval: Duration, sink: Arc<dyn EventSink>) -> Self {
        Self {
            recorder,
            interval,
            sink,
            shutdown: CancellationToken::new(),
        }
    }

    /// Spawn the reporting loop.
    ///
    /// Every interval the recorder is flushed; intervals with no samples emit
    /// nothing. The loop exits on [`stop`].
    ///
    /// [`stop`]: TraceReporter::stop
    pub fn start(&self) -> JoinHandle<()> {
        let recorder = Arc::clone(&self.recorder);
        let sink = Arc::clone(&self.sink);
        let token = self.shutdown.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately; reporting
            // starts one full interval in.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => report(&recorder, &*sink),
                    _ = token.cancelled() => break,
                }
            }
        })
    }

    /// Stop the reporting loop.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

fn report(recorder: &TraceRecorder, sink: &dyn EventSink) {
    let flushed = recorder.flush();
    if flushed.is_empty() {
        return;
    }

    let mut event = PoolEvent::new(Severity::Info, "monitor", "trace_stats", "trace statistics");
    for (label, values) in &flushed {
        if let Ok(stats) = Stats::from_values(values) {
            event = event.with_field(
                label,
                serde_json::to_value(stats).unwrap_or(serde_json::Value::Null),
            );
        }
    }
    sink.emit(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use std::time::Instant;

    #[tokio::test]
    async fn test_reports_flushed_stats() {
        let recorder = Arc::new(TraceRecorder::new());
        let sink = Arc::new(MemorySink::new());
        let reporter = TraceReporter::new(
            Arc::clone(&recorder),
            Duration::from_millis(20),
            sink.clone(),
        );
        let handle = reporter.start();

        recorder.record("fetch", Instant::now());
        tokio::time::sleep(Duration::from_millis(80)).await;

        let events = sink.events_for("trace_stats");
        assert!(!events.is_empty());
        assert!(events[0].fields.contains_key("fetch"));
        // Flushed: the label does not report again
        assert_eq!(recorder.label_count(), 0);

        reporter.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_quiet_intervals_emit_nothing() {
        let sink = Arc::new(MemorySink::new());
        let reporter = TraceReporter::new(
            Arc::new(TraceRecorder::new()),
            Duration::from_millis(10),
            sink.clone(),
        );
        let handle = reporter.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        reporter.stop();
        handle.await.unwrap();

        assert!(sink.events_for("trace_stats").is_empty());
    }
}
