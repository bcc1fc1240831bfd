//! Timestamped numeric samples with windowed range queries
//!
//! A [`TimeSeries`] owns one [`BoundedBuffer`] of samples and answers
//! elapsed-time window queries over it, feeding the statistics engine.

use std::time::Instant;

use crate::buffer::BoundedBuffer;
use crate::stats::{EmptyInputError, Stats};

/// One timestamped measurement. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: Instant,
    pub value: f64,
}

/// Bounded series of timestamped samples.
///
/// Samples are assumed pushed in non-decreasing timestamp order by a single
/// logical producer path; the series does not sort. This is a documented
/// precondition, not an enforced invariant - queries walk the buffer in
/// insertion order.
#[derive(Debug)]
pub struct TimeSeries {
    buffer: BoundedBuffer<Sample>,
}

impl TimeSeries {
    /// Create a series retaining at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: BoundedBuffer::new(capacity),
        }
    }

    /// Append `(timestamp, value)`, evicting the oldest sample when full.
    pub fn push(&self, timestamp: Instant, value: f64) {
        self.buffer.push(Sample { timestamp, value });
    }

    /// Samples with `start < timestamp < end`, in buffer order.
    ///
    /// Bounds are strict on both ends: a sample at exactly `start` or `end`
    /// is excluded.
    pub fn query(&self, start: Instant, end: Instant) -> Vec<Sample> {
        self.buffer
            .snapshot()
            .into_iter()
            .filter(|sample| sample.timestamp > start && sample.timestamp < end)
            .collect()
    }

    /// Aggregate statistics over the values inside `(start, end)`.
    ///
    /// Propagates [`EmptyInputError`] when the window holds zero samples;
    /// callers treat that as "no data yet", not a defect.
    pub fn stats(&self, start: Instant, end: Instant) -> Result<Stats, EmptyInputError> {
        let values: Vec<f64> = self
            .query(start, end)
            .into_iter()
            .map(|sample| sample.value)
            .collect();

        Stats::from_values(&values)
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_query_strict_bounds() {
        let series = TimeSeries::new(10);
        let start = Instant::now();
        let end = start + Duration::from_secs(10);
        let inside = start + Duration::from_secs(5);

        series.push(start, 1.0); // at start: excluded
        series.push(inside, 2.0);
        series.push(end, 3.0); // at end: excluded

        let samples = series.query(start, end);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 2.0);
    }

    #[test]
    fn test_stats_over_window() {
        let series = TimeSeries::new(100);
        let start = Instant::now();
        let base = start + Duration::from_secs(10);

        for n in 0..10 {
            series.push(base + Duration::from_millis(n), n as f64);
        }

        let stats = series
            .stats(start, base + Duration::from_secs(3600))
            .unwrap();
        assert_eq!(stats.average, 4.5);
        assert_eq!(stats.median, 4.5);
        assert_eq!(stats.sum, 45.0);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.count, 10);
    }

    #[test]
    fn test_stats_empty_window() {
        let series = TimeSeries::new(10);
        let now = Instant::now();
        series.push(now, 1.0);

        // Window entirely after the sample
        let result = series.stats(now + Duration::from_secs(10), now + Duration::from_secs(20));
        assert_eq!(result, Err(EmptyInputError));
    }

    #[test]
    fn test_eviction_bounds_retention() {
        let series = TimeSeries::new(3);
        let now = Instant::now();
        let base = now + Duration::from_millis(1);

        for n in 0..5 {
            series.push(base + Duration::from_millis(n), n as f64);
        }

        assert_eq!(series.len(), 3);
        let stats = series
            .stats(now, base + Duration::from_secs(1))
            .unwrap();
        // Oldest two samples (0.0, 1.0) were evicted
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 4.0);
    }
}
