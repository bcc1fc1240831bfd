//! Scaling controller
//!
//! A single periodic loop per pool that converts "N tasks per window" into a
//! worker count and a per-task pacing delay, using only the pool's own
//! duration telemetry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use paceline_telemetry::Stats;

use super::config::ScaleStrategy;
use super::pool::PoolInner;
use crate::events::{PoolEvent, Severity};

/// The configured throughput target: `desired` task completions per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ThroughputTarget {
    pub(crate) window: Duration,
    pub(crate) desired: i64,
}

/// Launch the controller loop. Spawned once per pool; exits when the pool's
/// shutdown token is cancelled.
pub(crate) fn spawn<T: Send + 'static>(inner: Arc<PoolInner<T>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(inner.config.control_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => apply(&inner),
                _ = inner.shutdown.cancelled() => break,
            }
        }

        debug!("scaling controller exited");
    })
}

/// One control cycle: read the trailing duration stats, recompute the
/// parameters, store the delay, and rescale when the worker count changed.
fn apply<T: Send + 'static>(inner: &Arc<PoolInner<T>>) {
    if inner.strategy() != ScaleStrategy::TargetThroughput {
        return;
    }
    let target = match *inner.target.read() {
        Some(target) => target,
        None => return,
    };

    let end = Instant::now();
    let start = end.checked_sub(inner.config.control_window).unwrap_or(end);
    let measured = inner.duration_series.stats(start, end).ok();
    let avg_duration = effective_avg_duration(measured, inner.config.default_task_duration);

    let (worker_count, delay) = calculate_parameters(target.window, target.desired, avg_duration);
    inner.set_task_delay(delay);

    inner.emit(
        PoolEvent::new(Severity::Info, "scaler", "apply", "scaling decision")
            .with_field("desired", target.desired)
            .with_field("window_ms", target.window.as_millis() as u64)
            .with_field("avg_task_duration_ms", avg_duration.as_millis() as u64)
            .with_field("worker_count", worker_count)
            .with_field("per_task_delay_ms", delay.as_millis() as u64),
    );

    if worker_count != inner.worker_count() {
        inner.scale_worker(worker_count);
    }
}

/// The average duration to plan with: the measured average, unless the
/// window had no samples or the average is zero or non-finite (no data yet),
/// in which case `fallback`.
pub(crate) fn effective_avg_duration(measured: Option<Stats>, fallback: Duration) -> Duration {
    match measured {
        Some(stats) if stats.average > 0.0 && stats.average.is_finite() => {
            Duration::from_secs_f64(stats.average)
        }
        _ => fallback,
    }
}

/// Convert a throughput target into `(worker_count, per_task_delay)`.
///
/// `worker_count` is the minimum concurrency that fits all desired work into
/// one window; the remaining slack in worker time is spread evenly across
/// the desired tasks as a pacing delay, so completions are paced instead of
/// bursting at the start of each window.
pub fn calculate_parameters(
    window: Duration,
    desired: i64,
    avg_duration: Duration,
) -> (i64, Duration) {
    if desired <= 0 {
        return (0, Duration::ZERO);
    }
    let window_secs = window.as_secs_f64();
    if window_secs <= 0.0 {
        return (0, Duration::ZERO);
    }

    let total_work = desired as f64 * avg_duration.as_secs_f64();
    let worker_count = (total_work / window_secs).ceil() as i64;

    let available = worker_count as f64 * window_secs;
    let slack = available - total_work;
    let delay = Duration::from_secs_f64((slack / desired as f64).max(0.0));

    (worker_count, delay)
}
