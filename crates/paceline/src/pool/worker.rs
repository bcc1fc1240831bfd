//! Worker loop
//!
//! Each worker is a spawned task bound to the pool's shared queues; it has no
//! state of its own beyond the live counter and its cancellation token.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::config::ScaleStrategy;
use super::pool::PoolInner;
use crate::events::{PoolEvent, Severity};

/// Handle to one live worker, held in the pool's worker table.
pub(crate) struct WorkerHandle {
    pub(crate) id: Uuid,
    pub(crate) token: CancellationToken,
    pub(crate) handle: JoinHandle<()>,
}

/// The worker loop: wait for the next task or cancellation, execute, record
/// telemetry, pace.
///
/// Cancellation is only observed between tasks - a worker always finishes
/// the task it is executing. The loop also exits when the task queue has
/// been closed and drained.
pub(crate) async fn run<T: Send + 'static>(
    inner: Arc<PoolInner<T>>,
    id: Uuid,
    token: CancellationToken,
) {
    loop {
        let task = tokio::select! {
            _ = token.cancelled() => break,
            task = next_task(&inner) => match task {
                Some(task) => task,
                // Queue closed and drained
                None => break,
            },
        };

        let started = Instant::now();
        let result = (inner.handler)(task).await;

        if let Err(error) = result {
            inner.error_series.push(Instant::now(), 1.0);
            inner.emit(
                PoolEvent::new(Severity::Warn, "worker", "task_error", error.to_string())
                    .with_field("worker_id", id.to_string()),
            );
            // A full error channel blocks here until the caller drains it
            // (backpressure); a dropped receiver discards the error.
            let _ = inner.errors_tx.send(error).await;
        }

        inner
            .duration_series
            .push(Instant::now(), started.elapsed().as_secs_f64());

        if inner.strategy() == ScaleStrategy::TargetThroughput {
            let delay = inner.task_delay();
            if !delay.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    inner.worker_exited();
    inner.emit(
        PoolEvent::new(Severity::Debug, "worker", "worker_exit", "worker exited")
            .with_field("worker_id", id.to_string()),
    );
}

/// Receive the next task from the shared queue.
///
/// Only one idle worker holds the receiver at a time; the channel preserves
/// FIFO arrival order across producers.
async fn next_task<T>(inner: &PoolInner<T>) -> Option<T> {
    let mut receiver = inner.tasks_rx.lock().await;
    receiver.recv().await
}
