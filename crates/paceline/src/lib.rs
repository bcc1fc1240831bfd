//! # Paceline
//!
//! Throughput-targeted adaptive worker pool.
//!
//! A [`WorkerPool`] executes a stream of caller-supplied tasks across a
//! dynamic set of concurrent workers. In [`ScaleStrategy::TargetThroughput`]
//! mode a scaling controller continuously converts a "N tasks per window"
//! target into a worker count and a per-task pacing delay, using only recent,
//! locally measured telemetry (task durations, errors, arrivals) - no
//! external metrics source.
//!
//! ## Features
//!
//! - **Bounded everything**: task queue, error channel, and telemetry buffers
//!   all have fixed capacities; a full queue blocks the producer
//!   (backpressure), it never errors
//! - **Fault isolation per task**: handler errors are forwarded to the error
//!   channel and the worker moves on; the pool never aborts
//! - **Deterministic teardown**: workers and the controller carry
//!   cancellation tokens and are joined by [`WorkerPool::shutdown`]
//! - **Injected observability**: decision points are reported through an
//!   [`EventSink`], not through process-wide logging state
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use paceline::{PoolConfig, WorkerPool};
//!
//! let pool = WorkerPool::new(
//!     |job: Job| async move { process(job).await },
//!     PoolConfig::new(100),
//! );
//!
//! // 20 completions per 10 second window
//! pool.scale_tasks_per(Duration::from_secs(10), 20);
//!
//! pool.add_task(job).await?;
//! ```

pub mod events;
pub mod monitor;
pub mod pool;

/// Re-export of the telemetry crate.
pub use paceline_telemetry as telemetry;

/// Prelude for common imports
pub mod prelude {
    pub use crate::events::{EventSink, NoopSink, PoolEvent, Severity, TracingSink};
    pub use crate::monitor::TraceReporter;
    pub use crate::pool::{PoolConfig, PoolError, PoolStats, ScaleStrategy, WorkerPool};
    pub use paceline_telemetry::{EmptyInputError, Stats, TimeSeries, TraceRecorder};
}

// Re-export key types at crate root
pub use events::{EventSink, MemorySink, NoopSink, PoolEvent, Severity, TracingSink};
pub use monitor::TraceReporter;
pub use pool::{
    calculate_parameters, PoolConfig, PoolError, PoolStats, ScaleStrategy, TaskHandler,
    WorkerPool,
};
