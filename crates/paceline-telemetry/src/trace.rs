//! Label-keyed duration aggregation
//!
//! A [`TraceRecorder`] collects elapsed-time samples under free-form labels
//! and aggregates them on demand. It is an injectable instance - share one
//! via `Arc` instead of reaching for process-wide state.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;

use crate::stats::Stats;

/// Collects elapsed-seconds samples per label.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    samples: Mutex<HashMap<String, Vec<f64>>>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the time elapsed since `start` under `label`.
    pub fn record(&self, label: &str, start: Instant) {
        let elapsed = start.elapsed().as_secs_f64();
        self.samples
            .lock()
            .entry(label.to_string())
            .or_default()
            .push(elapsed);
    }

    /// Aggregate statistics per label.
    pub fn stats(&self) -> HashMap<String, Stats> {
        let samples = self.samples.lock();
        samples
            .iter()
            .filter_map(|(label, values)| {
                Stats::from_values(values)
                    .ok()
                    .map(|stats| (label.clone(), stats))
            })
            .collect()
    }

    /// Take and clear all collected samples.
    pub fn flush(&self) -> HashMap<String, Vec<f64>> {
        std::mem::take(&mut *self.samples.lock())
    }

    /// Number of labels with at least one sample.
    pub fn label_count(&self) -> usize {
        self.samples.lock().len()
    }
}
