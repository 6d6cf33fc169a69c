//! Tunables consumed by the queue facade and the worker pool.
//!
//! Loading these from the environment is the binary's job; the core only
//! defines the shape, the defaults and the validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent workers in the pool.
    pub worker_count: usize,

    /// Failed attempts that may be retried before a task is marked failed.
    pub max_retries: u32,

    /// Sleep after an empty claim.
    pub idle_poll_interval: Duration,

    /// Sleep after an infrastructure fault in the worker loop.
    pub error_backoff_interval: Duration,

    /// Notify observers on every n-th progress tick (plus the first and last).
    pub progress_notify_every: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            max_retries: 3,
            idle_poll_interval: Duration::from_secs(1),
            error_backoff_interval: Duration::from_secs(5),
            progress_notify_every: 3,
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::InvalidWorkerCount(self.worker_count));
        }
        if self.progress_notify_every == 0 {
            return Err(ConfigError::InvalidNotifyEvery);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Upper bound on the population `stats()` counts over.
    pub stats_scan_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            stats_scan_limit: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = WorkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.idle_poll_interval, Duration::from_secs(1));
        assert_eq!(config.error_backoff_interval, Duration::from_secs(5));
        assert_eq!(QueueConfig::default().stats_scan_limit, 1000);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let config = WorkerConfig {
            worker_count: 0,
            ..WorkerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWorkerCount(0))));
    }

    #[test]
    fn zero_notify_stride_is_rejected() {
        let config = WorkerConfig {
            progress_notify_every: 0,
            ..WorkerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidNotifyEvery)));
    }
}
