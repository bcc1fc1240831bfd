//! Worker pool configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the pool decides its worker count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleStrategy {
    /// Worker count is whatever the caller last set manually.
    #[default]
    FixedWorkerCount,
    /// The scaling controller drives worker count and per-task pacing toward
    /// a configured throughput target.
    TargetThroughput,
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Bounded task queue capacity; a full queue blocks `add_task`
    pub queue_capacity: usize,

    /// Bounded error channel capacity; a full channel blocks the reporting
    /// worker until the caller drains it
    pub error_capacity: usize,

    /// Samples retained per telemetry series (errors, durations, arrivals)
    pub telemetry_capacity: usize,

    /// Scaling controller poll interval
    #[serde(with = "duration_millis")]
    pub control_interval: Duration,

    /// Trailing window the controller reads duration stats over
    #[serde(with = "duration_millis")]
    pub control_window: Duration,

    /// Assumed average task duration while the window has no data
    #[serde(with = "duration_millis")]
    pub default_task_duration: Duration,

    /// Graceful shutdown timeout
    #[serde(with = "duration_millis")]
    pub shutdown_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            error_capacity: 100,
            telemetry_capacity: 1000,
            control_interval: Duration::from_secs(5),
            control_window: Duration::from_secs(60),
            default_task_duration: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with the given task queue capacity.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
            ..Default::default()
        }
    }

    /// Set the task queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the error channel capacity
    pub fn with_error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity.max(1);
        self
    }

    /// Set the per-series telemetry retention
    pub fn with_telemetry_capacity(mut self, capacity: usize) -> Self {
        self.telemetry_capacity = capacity.max(1);
        self
    }

    /// Set the controller poll interval
    pub fn with_control_interval(mut self, interval: Duration) -> Self {
        self.control_interval = interval;
        self
    }

    /// Set the controller stats window
    pub fn with_control_window(mut self, window: Duration) -> Self {
        self.control_window = window;
        self
    }

    /// Set the no-data fallback for average task duration
    pub fn with_default_task_duration(mut self, duration: Duration) -> Self {
        self.default_task_duration = duration;
        self
    }

    /// Set the graceful shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
