//! Adaptive worker pool
//!
//! This module provides:
//! - [`WorkerPool`] - bounded task queue executed by a dynamic set of workers
//! - [`PoolConfig`] - queue, telemetry, and control-loop configuration
//! - [`ScaleStrategy`] - manual worker count vs. throughput-targeted scaling
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        WorkerPool                            │
//! │                                                              │
//! │  add_task ──► bounded task queue ──► [W1] [W2] ... [Wn]      │
//! │                                        │                     │
//! │            errors ◄────────────────────┤                     │
//! │                                        ▼                     │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │   TimeSeries: errors / durations / arrivals        │      │
//! │  └────────────────────────┬───────────────────────────┘      │
//! │                           ▼                                  │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │  ScalingController (interval loop, cancellable)    │      │
//! │  │  worker count + per-task delay ◄─ throughput target│      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Workers observe the recomputed per-task delay on their next iteration;
//! scaling and stopping are serialized under the pool's worker-table lock.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use paceline::pool::{PoolConfig, WorkerPool};
//!
//! let pool = WorkerPool::new(
//!     |task: Request| async move { handle(task).await },
//!     PoolConfig::new(100),
//! );
//!
//! // Hold 20 tasks per 10s window, pacing spread across tasks
//! pool.scale_tasks_per(Duration::from_secs(10), 20);
//!
//! pool.add_task(request).await?;
//!
//! // Graceful teardown
//! pool.shutdown().await?;
//! ```

mod config;
mod scaler;
#[allow(clippy::module_inception)]
mod pool;
mod worker;

pub use config::{PoolConfig, ScaleStrategy};
pub use pool::{PoolError, PoolStats, TaskHandler, WorkerPool};
pub use scaler::calculate_parameters;
