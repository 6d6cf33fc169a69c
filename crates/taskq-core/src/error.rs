use thiserror::Error;

use crate::domain::{TaskId, TaskKind, TaskStatus};

/// Errors surfaced by the queue facade and its backing structures.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("priority must be within 1..=10, got {0}")]
    InvalidPriority(i64),

    #[error("task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("stored record for {id} is unreadable: {source}")]
    CorruptRecord {
        id: TaskId,
        #[source]
        source: serde_json::Error,
    },
}

impl QueueError {
    /// Infrastructure faults are worth retrying after a backoff; validation
    /// failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::StoreUnavailable(_))
    }
}

/// Failure of a task's own work step. Drives the retry-or-fail decision.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("handler not found for task kind {0}")]
    HandlerNotFound(TaskKind),

    #[error("duplicate handler for task kind {0}")]
    DuplicateHandler(TaskKind),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("worker_count must be at least 1, got {0}")]
    InvalidWorkerCount(usize),

    #[error("progress_notify_every must be at least 1")]
    InvalidNotifyEvery,

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
