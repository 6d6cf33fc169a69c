//! Simulated work: sleeps through a number of steps, reporting progress,
//! and fails at random with a configurable probability.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::ProgressReporter;
use crate::domain::{Task, TaskKind};
use crate::error::ExecutionError;
use crate::runtime::TaskHandler;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub steps: u32,
    pub min_step_delay: Duration,
    pub max_step_delay: Duration,
    /// Probability in `[0, 1]` that any single step fails.
    pub failure_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: 10,
            min_step_delay: Duration::from_millis(500),
            max_step_delay: Duration::from_millis(2000),
            failure_rate: 0.05,
        }
    }
}

impl SimulationConfig {
    /// No delays, no failures.
    pub fn instant() -> Self {
        Self {
            steps: 10,
            min_step_delay: Duration::ZERO,
            max_step_delay: Duration::ZERO,
            failure_rate: 0.0,
        }
    }

    fn step_delay(&self) -> Duration {
        let spread = self.max_step_delay.saturating_sub(self.min_step_delay);
        self.min_step_delay + spread.mul_f64(rand::random::<f64>())
    }
}

pub struct SimulatedHandler {
    config: SimulationConfig,
}

impl SimulatedHandler {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }
}

fn payload_str<'a>(task: &'a Task, key: &str) -> &'a str {
    task.payload.get(key).and_then(|v| v.as_str()).unwrap_or("unknown")
}

/// The conventional payload key for a kind, and whether it holds a number.
fn payload_key(kind: TaskKind) -> (&'static str, bool) {
    match kind {
        TaskKind::Email => ("recipient", false),
        TaskKind::DataProcessing => ("data_size", true),
        TaskKind::FileConversion => ("filename", false),
        TaskKind::ApiCall => ("endpoint", false),
        TaskKind::ReportGeneration => ("report_type", false),
    }
}

/// The key may be absent, but not of the wrong type.
fn check_payload(task: &Task) -> Result<(), ExecutionError> {
    let (key, numeric) = payload_key(task.kind);
    let Some(value) = task.payload.get(key) else {
        return Ok(());
    };
    let ok = if numeric { value.is_u64() } else { value.is_string() };
    if ok {
        Ok(())
    } else {
        Err(ExecutionError::InvalidPayload(format!(
            "{key} for {} task must be {}, got {value}",
            task.kind,
            if numeric { "a non-negative integer" } else { "a string" }
        )))
    }
}

/// The kind-specific part of the work. Reads the conventional payload key.
fn finish(task: &Task) {
    match task.kind {
        TaskKind::Email => {
            info!(task_id = %task.id, recipient = payload_str(task, "recipient"), "sending email");
        }
        TaskKind::DataProcessing => {
            let records = task.payload.get("data_size").and_then(|v| v.as_u64()).unwrap_or(0);
            info!(task_id = %task.id, records, "processing data");
        }
        TaskKind::FileConversion => {
            info!(task_id = %task.id, filename = payload_str(task, "filename"), "converting file");
        }
        TaskKind::ApiCall => {
            info!(task_id = %task.id, endpoint = payload_str(task, "endpoint"), "calling api");
        }
        TaskKind::ReportGeneration => {
            info!(task_id = %task.id, report_type = payload_str(task, "report_type"), "generating report");
        }
    }
}

#[async_trait]
impl TaskHandler for SimulatedHandler {
    async fn handle(
        &self,
        task: &Task,
        progress: &mut ProgressReporter,
    ) -> Result<(), ExecutionError> {
        check_payload(task)?;

        let steps = self.config.steps.max(1);
        for step in 1..=steps {
            let delay = self.config.step_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            progress.report(step, steps).await?;

            if self.config.failure_rate > 0.0 && rand::random::<f64>() < self.config.failure_rate {
                return Err(ExecutionError::Failed(format!(
                    "simulated failure at step {step}/{steps}"
                )));
            }
        }
        finish(task);
        Ok(())
    }
}
