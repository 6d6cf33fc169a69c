//! Runtime settings for the `taskq` binary.
//!
//! Every flag can also come from the environment (`TASKQ_*`), and a `.env`
//! file in the working directory is loaded first.

use std::time::Duration;

use clap::Args;

use taskq_core::{ConfigError, SimulationConfig, WorkerConfig};

/// Load `.env` if present. Missing file is fine.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

#[derive(Args, Debug, Clone)]
pub struct PoolArgs {
    /// Number of concurrent workers.
    #[arg(long, env = "TASKQ_WORKERS", default_value_t = 4)]
    pub workers: usize,

    /// Retries allowed before a task is marked failed.
    #[arg(long, env = "TASKQ_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Sleep after an empty claim, in milliseconds.
    #[arg(long, env = "TASKQ_IDLE_POLL_MS", default_value_t = 1000)]
    pub idle_poll_ms: u64,

    /// Sleep after an infrastructure fault, in milliseconds.
    #[arg(long, env = "TASKQ_ERROR_BACKOFF_MS", default_value_t = 5000)]
    pub error_backoff_ms: u64,

    /// Notify observers on every n-th progress tick.
    #[arg(long, env = "TASKQ_PROGRESS_NOTIFY_EVERY", default_value_t = 3)]
    pub progress_notify_every: u32,
}

impl PoolArgs {
    pub fn worker_config(&self) -> Result<WorkerConfig, ConfigError> {
        let config = WorkerConfig {
            worker_count: self.workers,
            max_retries: self.max_retries,
            idle_poll_interval: Duration::from_millis(self.idle_poll_ms),
            error_backoff_interval: Duration::from_millis(self.error_backoff_ms),
            progress_notify_every: self.progress_notify_every,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct SimulationArgs {
    /// Steps per simulated task.
    #[arg(long, env = "TASKQ_SIM_STEPS", default_value_t = 10)]
    pub steps: u32,

    /// Lower bound of the per-step delay, in milliseconds.
    #[arg(long, env = "TASKQ_SIM_MIN_STEP_MS", default_value_t = 500)]
    pub min_step_ms: u64,

    /// Upper bound of the per-step delay, in milliseconds.
    #[arg(long, env = "TASKQ_SIM_MAX_STEP_MS", default_value_t = 2000)]
    pub max_step_ms: u64,

    /// Probability that a single step fails.
    #[arg(long, env = "TASKQ_SIM_FAILURE_RATE", default_value_t = 0.05)]
    pub failure_rate: f64,
}

impl SimulationArgs {
    pub fn simulation_config(&self) -> Result<SimulationConfig, ConfigError> {
        if self.steps == 0 {
            return Err(invalid("TASKQ_SIM_STEPS", self.steps));
        }
        if self.min_step_ms > self.max_step_ms {
            return Err(invalid(
                "TASKQ_SIM_MIN_STEP_MS",
                format!("{} > {}", self.min_step_ms, self.max_step_ms),
            ));
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(invalid("TASKQ_SIM_FAILURE_RATE", self.failure_rate));
        }
        Ok(SimulationConfig {
            steps: self.steps,
            min_step_delay: Duration::from_millis(self.min_step_ms),
            max_step_delay: Duration::from_millis(self.max_step_ms),
            failure_rate: self.failure_rate,
        })
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim(min: u64, max: u64, rate: f64) -> SimulationArgs {
        SimulationArgs {
            steps: 10,
            min_step_ms: min,
            max_step_ms: max,
            failure_rate: rate,
        }
    }

    #[test]
    fn pool_args_map_to_worker_config() {
        let args = PoolArgs {
            workers: 2,
            max_retries: 5,
            idle_poll_ms: 250,
            error_backoff_ms: 750,
            progress_notify_every: 1,
        };
        let config = args.worker_config().unwrap();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.idle_poll_interval, Duration::from_millis(250));
        assert_eq!(config.error_backoff_interval, Duration::from_millis(750));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let args = PoolArgs {
            workers: 0,
            max_retries: 3,
            idle_poll_ms: 1000,
            error_backoff_ms: 5000,
            progress_notify_every: 3,
        };
        assert!(matches!(
            args.worker_config(),
            Err(ConfigError::InvalidWorkerCount(0))
        ));
    }

    #[test]
    fn simulation_bounds_are_checked() {
        assert!(sim(500, 2000, 0.05).simulation_config().is_ok());
        assert!(sim(2000, 500, 0.05).simulation_config().is_err());
        assert!(sim(0, 0, 1.5).simulation_config().is_err());
        assert!(sim(0, 0, -0.1).simulation_config().is_err());
    }
}
