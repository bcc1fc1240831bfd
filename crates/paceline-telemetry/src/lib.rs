//! # Paceline Telemetry
//!
//! Bounded, locally measured telemetry for the Paceline worker pool.
//!
//! - [`stats`] - pure aggregate functions over finite value sequences
//! - [`BoundedBuffer`] - fixed-capacity buffer with oldest-first eviction
//! - [`TimeSeries`] - timestamped samples with windowed range queries
//! - [`TraceRecorder`] - label-keyed duration aggregation
//!
//! Nothing here persists data or talks to the network; every structure is an
//! in-process value store sized at construction. All types take `&self` and
//! are safe to share across threads behind an `Arc`.

pub mod buffer;
pub mod series;
pub mod stats;
pub mod trace;

pub use buffer::BoundedBuffer;
pub use series::{Sample, TimeSeries};
pub use stats::{EmptyInputError, Stats};
pub use trace::TraceRecorder;
