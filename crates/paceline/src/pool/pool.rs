//! Worker pool: bounded queues, dynamic workers, telemetry, shutdown

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{join_all, BoxFuture};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use paceline_telemetry::{EmptyInputError, Stats, TimeSeries};

use super::config::{PoolConfig, ScaleStrategy};
use super::scaler::{self, ThroughputTarget};
use super::worker::{self, WorkerHandle};
use crate::events::{EventSink, PoolEvent, Severity, TracingSink};

/// Task handler shared read-only by all workers.
pub type TaskHandler<T> =
    Arc<dyn Fn(T) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Worker pool errors.
///
/// Task-level handler failures are not here: they are forwarded on the error
/// channel and never abort the pool. A full queue is backpressure, not an
/// error.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The task queue was closed by `shutdown`
    #[error("task queue is closed")]
    QueueClosed,

    /// Shutdown timeout
    #[error("graceful shutdown timed out")]
    ShutdownTimeout,
}

/// Snapshot of pool telemetry over one trailing window.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolStats {
    pub errors: Stats,
    pub new_tasks: Stats,
    pub task_duration: Stats,
    pub worker_count: i64,
    pub queue_length: usize,
}

/// Shared pool state behind the `WorkerPool` handle.
pub(crate) struct PoolInner<T> {
    pub(crate) handler: TaskHandler<T>,
    pub(crate) config: PoolConfig,
    /// Taken (dropped) on shutdown to close the queue.
    tasks_tx: Mutex<Option<mpsc::Sender<T>>>,
    /// Shared by all workers; one idle worker holds the receiver at a time.
    pub(crate) tasks_rx: AsyncMutex<mpsc::Receiver<T>>,
    pub(crate) errors_tx: mpsc::Sender<anyhow::Error>,
    errors_rx: Mutex<Option<mpsc::Receiver<anyhow::Error>>>,
    /// Worker table; its lock doubles as the scale lock so overlapping
    /// scale calls cannot race on the diff computation.
    workers: Mutex<Vec<WorkerHandle>>,
    live_workers: AtomicI64,
    strategy: RwLock<ScaleStrategy>,
    pub(crate) target: RwLock<Option<ThroughputTarget>>,
    task_delay_nanos: AtomicU64,
    controller_armed: AtomicBool,
    controller_handle: Mutex<Option<JoinHandle<()>>>,
    pub(crate) shutdown: CancellationToken,
    pub(crate) error_series: TimeSeries,
    pub(crate) duration_series: TimeSeries,
    pub(crate) arrival_series: TimeSeries,
    sink: Arc<dyn EventSink>,
}

impl<T: Send + 'static> PoolInner<T> {
    pub(crate) fn emit(&self, event: PoolEvent) {
        self.sink.emit(event);
    }

    pub(crate) fn strategy(&self) -> ScaleStrategy {
        *self.strategy.read()
    }

    pub(crate) fn task_delay(&self) -> Duration {
        Duration::from_nanos(self.task_delay_nanos.load(Ordering::Relaxed))
    }

    pub(crate) fn set_task_delay(&self, delay: Duration) {
        self.task_delay_nanos
            .store(delay.as_nanos() as u64, Ordering::Relaxed);
    }

    pub(crate) fn worker_count(&self) -> i64 {
        self.live_workers.load(Ordering::Relaxed)
    }

    pub(crate) fn worker_exited(&self) {
        self.live_workers.fetch_sub(1, Ordering::Relaxed);
    }

    /// Spawn one worker. The live counter is incremented before the worker
    /// loop starts so `worker_count` immediately reflects in-flight starts.
    fn spawn_worker(self: &Arc<Self>, workers: &mut Vec<WorkerHandle>) {
        let id = Uuid::now_v7();
        let token = self.shutdown.child_token();
        self.live_workers.fetch_add(1, Ordering::Relaxed);
        self.emit(
            PoolEvent::new(Severity::Debug, "pool", "start_worker", "starting worker")
                .with_field("worker_id", id.to_string()),
        );

        let handle = tokio::spawn(worker::run(Arc::clone(self), id, token.clone()));
        workers.push(WorkerHandle { id, token, handle });
    }

    /// Cancel the most recently started live worker. Clamped: with no live
    /// workers this is a no-op, so excess stop calls can never leave a quit
    /// signal pending for a future worker.
    fn stop_worker(&self, workers: &mut Vec<WorkerHandle>) {
        match workers.pop() {
            Some(worker) => {
                worker.token.cancel();
                self.emit(
                    PoolEvent::new(Severity::Debug, "pool", "stop_worker", "stopping worker")
                        .with_field("worker_id", worker.id.to_string()),
                );
            }
            None => {
                self.emit(PoolEvent::new(
                    Severity::Warn,
                    "pool",
                    "stop_worker",
                    "no live workers to stop",
                ));
            }
        }
    }

    pub(crate) fn scale_worker(self: &Arc<Self>, desired: i64) {
        let desired = desired.max(0);
        let mut workers = self.workers.lock();
        let current = workers.len() as i64;
        let diff = desired - current;

        self.emit(
            PoolEvent::new(Severity::Info, "pool", "scale_worker", "scaling workers")
                .with_field("desired", desired)
                .with_field("current", current)
                .with_field("diff", diff),
        );

        if diff >= 0 {
            for _ in 0..diff {
                self.spawn_worker(&mut workers);
            }
        } else {
            for _ in 0..-diff {
                self.stop_worker(&mut workers);
            }
        }
    }
}

/// Throughput-targeted adaptive worker pool.
///
/// Executes caller-supplied tasks on a dynamic set of tokio workers, records
/// duration/error/arrival telemetry locally, and - in
/// [`ScaleStrategy::TargetThroughput`] mode - continuously adjusts worker
/// count and per-task pacing to hit a "N tasks per window" target.
///
/// The handle is cheap to clone; all clones share one pool.
pub struct WorkerPool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for WorkerPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Create a pool with the default [`TracingSink`].
    ///
    /// `handler` is supplied once and shared read-only across all workers;
    /// it owns its own failure handling - returned errors are forwarded, not
    /// retried.
    pub fn new<F, Fut>(handler: F, config: PoolConfig) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::with_event_sink(handler, config, Arc::new(TracingSink))
    }

    /// Create a pool reporting decision points to `sink`.
    pub fn with_event_sink<F, Fut>(
        handler: F,
        config: PoolConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: TaskHandler<T> = Arc::new(move |task| Box::pin(handler(task)));

        let (tasks_tx, tasks_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (errors_tx, errors_rx) = mpsc::channel(config.error_capacity.max(1));
        let telemetry_capacity = config.telemetry_capacity.max(1);

        let inner = Arc::new(PoolInner {
            handler,
            tasks_tx: Mutex::new(Some(tasks_tx)),
            tasks_rx: AsyncMutex::new(tasks_rx),
            errors_tx,
            errors_rx: Mutex::new(Some(errors_rx)),
            workers: Mutex::new(Vec::new()),
            live_workers: AtomicI64::new(0),
            strategy: RwLock::new(ScaleStrategy::FixedWorkerCount),
            target: RwLock::new(None),
            task_delay_nanos: AtomicU64::new(0),
            controller_armed: AtomicBool::new(false),
            controller_handle: Mutex::new(None),
            shutdown: CancellationToken::new(),
            error_series: TimeSeries::new(telemetry_capacity),
            duration_series: TimeSeries::new(telemetry_capacity),
            arrival_series: TimeSeries::new(telemetry_capacity),
            sink,
            config,
        });

        inner.emit(
            PoolEvent::new(Severity::Info, "pool", "new", "pool created")
                .with_field("queue_capacity", inner.config.queue_capacity as u64)
                .with_field("telemetry_capacity", inner.config.telemetry_capacity as u64),
        );

        Self { inner }
    }

    /// Enqueue a task, blocking while the queue is full.
    ///
    /// The block is deliberate backpressure on the producer, never a fault.
    /// Records an arrival sample. Fails only after [`shutdown`] closed the
    /// queue.
    ///
    /// [`shutdown`]: WorkerPool::shutdown
    pub async fn add_task(&self, task: T) -> Result<(), PoolError> {
        let sender = {
            self.inner
                .tasks_tx
                .lock()
                .as_ref()
                .cloned()
                .ok_or(PoolError::QueueClosed)?
        };

        sender.send(task).await.map_err(|_| PoolError::QueueClosed)?;
        self.inner.arrival_series.push(Instant::now(), 1.0);
        Ok(())
    }

    /// Spawn one additional worker.
    pub fn start_worker(&self) {
        let mut workers = self.inner.workers.lock();
        self.inner.spawn_worker(&mut workers);
    }

    /// Stop one worker: the most recently started one finishes its current
    /// task and exits. A no-op when no workers are live.
    pub fn stop_worker(&self) {
        let mut workers = self.inner.workers.lock();
        self.inner.stop_worker(&mut workers);
    }

    /// Start or stop workers until the live count matches `desired`.
    ///
    /// Serialized under the pool's scale lock; calling again with the same
    /// `desired` issues zero additional start/stop operations. Negative
    /// values clamp to zero.
    pub fn scale_worker(&self, desired: i64) {
        self.inner.scale_worker(desired);
    }

    /// Set the scaling strategy.
    ///
    /// Switching back to [`ScaleStrategy::FixedWorkerCount`] pins the worker
    /// count: an armed controller keeps ticking but stops acting.
    pub fn set_strategy(&self, strategy: ScaleStrategy) {
        *self.inner.strategy.write() = strategy;
        self.inner.emit(
            PoolEvent::new(Severity::Info, "pool", "set_strategy", "strategy changed")
                .with_field("strategy", format!("{strategy:?}")),
        );
    }

    /// Target `desired` task completions per `window` and let the scaling
    /// controller drive worker count and per-task pacing toward it.
    ///
    /// The first call launches the controller loop; later calls only update
    /// the target (idempotent re-arm guard).
    pub fn scale_tasks_per(&self, window: Duration, desired: i64) {
        *self.inner.target.write() = Some(ThroughputTarget { window, desired });
        *self.inner.strategy.write() = ScaleStrategy::TargetThroughput;

        self.inner.emit(
            PoolEvent::new(Severity::Info, "pool", "scale_tasks_per", "throughput target set")
                .with_field("window_ms", window.as_millis() as u64)
                .with_field("desired", desired),
        );

        if !self.inner.controller_armed.swap(true, Ordering::SeqCst) {
            let handle = scaler::spawn(Arc::clone(&self.inner));
            *self.inner.controller_handle.lock() = Some(handle);
        }
    }

    /// Telemetry snapshot over `[now - window, now)`.
    ///
    /// Propagates [`EmptyInputError`] when any of the three series has no
    /// samples in the window - "no data yet", not a defect. The error series
    /// in particular stays empty until a handler has failed.
    pub fn stats(&self, window: Duration) -> Result<PoolStats, EmptyInputError> {
        let end = Instant::now();
        let start = end.checked_sub(window).unwrap_or(end);

        let snapshot = PoolStats {
            errors: self.inner.error_series.stats(start, end)?,
            new_tasks: self.inner.arrival_series.stats(start, end)?,
            task_duration: self.inner.duration_series.stats(start, end)?,
            worker_count: self.worker_count(),
            queue_length: self.queue_length(),
        };

        self.inner.emit(
            PoolEvent::new(Severity::Debug, "pool", "stats", "stats snapshot")
                .with_field(
                    "snapshot",
                    serde_json::to_value(snapshot).unwrap_or(serde_json::Value::Null),
                ),
        );

        Ok(snapshot)
    }

    /// Number of live workers (counted from the start call, so in-flight
    /// starts are included immediately).
    pub fn worker_count(&self) -> i64 {
        self.inner.worker_count()
    }

    /// Number of tasks currently buffered in the queue.
    pub fn queue_length(&self) -> usize {
        match self.inner.tasks_tx.lock().as_ref() {
            Some(sender) => sender.max_capacity() - sender.capacity(),
            None => 0,
        }
    }

    /// Current scaling strategy.
    pub fn strategy(&self) -> ScaleStrategy {
        self.inner.strategy()
    }

    /// The pacing delay workers currently apply between tasks in
    /// [`ScaleStrategy::TargetThroughput`] mode.
    pub fn per_task_delay(&self) -> Duration {
        self.inner.task_delay()
    }

    /// Take the error-report channel. Available once.
    ///
    /// Handler errors are forwarded here. The channel is bounded: a stalled
    /// consumer eventually blocks the workers that report into it, so the
    /// caller must keep draining it.
    pub fn take_errors(&self) -> Option<mpsc::Receiver<anyhow::Error>> {
        self.inner.errors_rx.lock().take()
    }

    /// Gracefully tear the pool down.
    ///
    /// Cancels the scaling controller and every worker, closes the task
    /// queue, and awaits all worker loops. Workers finish their current task
    /// before observing cancellation. Fails with
    /// [`PoolError::ShutdownTimeout`] when the configured timeout expires.
    pub async fn shutdown(&self) -> Result<(), PoolError> {
        self.inner.emit(PoolEvent::new(
            Severity::Info,
            "pool",
            "shutdown",
            "initiating graceful shutdown",
        ));

        // Worker tokens are children of the shutdown token
        self.inner.shutdown.cancel();
        drop(self.inner.tasks_tx.lock().take());

        let workers: Vec<WorkerHandle> = {
            let mut table = self.inner.workers.lock();
            table.drain(..).collect()
        };
        let controller = self.inner.controller_handle.lock().take();

        let drain = async {
            if let Some(handle) = controller {
                let _ = handle.await;
            }
            join_all(workers.into_iter().map(|worker| worker.handle)).await;
        };

        tokio::time::timeout(self.inner.config.shutdown_timeout, drain)
            .await
            .map_err(|_| PoolError::ShutdownTimeout)?;

        self.inner.emit(PoolEvent::new(
            Severity::Info,
            "pool",
            "shutdown",
            "pool stopped",
        ));
        Ok(())
    }
}
