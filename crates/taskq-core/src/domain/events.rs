//! Change notifications emitted by the queue and its workers.

use serde::{Deserialize, Serialize};

use super::TaskId;

/// What observers are told. Events carry only identities; observers re-read
/// the record or the stats they care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "task_id", rename_all = "snake_case")]
pub enum QueueEvent {
    TaskChanged(TaskId),
    StatsChanged,
}
