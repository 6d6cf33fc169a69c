//! Task status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a task.
///
/// State transitions:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Retrying -> Processing ... (while retries remain)
/// - Pending -> Processing -> Failed (retries exhausted)
///
/// Retrying has no explicit edge back to Pending: a requeued task sits in the
/// ready queue and is claimed exactly like a pending one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the ready queue, never attempted.
    Pending,

    /// Claimed and being executed by a worker.
    Processing,

    /// Finished successfully.
    Completed,

    /// Failed permanently.
    Failed,

    /// Failed at least once and back in the ready queue.
    Retrying,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::Processing,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Retrying,
    ];

    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Eligible to sit in the ready queue and be claimed.
    pub fn is_claimable(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Retrying)
    }

    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        match (self, next) {
            (from, TaskStatus::Processing) => from.is_claimable(),
            (TaskStatus::Processing, to) => matches!(
                to,
                TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Retrying
            ),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Retrying => "retrying",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
