//! TaskStore port - task record の正本（source of truth）

use async_trait::async_trait;

use crate::domain::{Task, TaskId};
use crate::error::QueueError;

/// Durable mapping from task id to the whole task record.
///
/// # 設計原則
/// - `put` replaces the full record (last write wins) and has no side effects;
///   callers inform the notifier themselves.
/// - `scan_all` may observe a moving population but never a half-written
///   record: every record it yields is exactly some value previously `put`.
/// - An unreachable store is `QueueError::StoreUnavailable`, never an empty
///   answer.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn put(&self, task: &Task) -> Result<(), QueueError>;

    async fn get(&self, id: TaskId) -> Result<Option<Task>, QueueError>;

    async fn scan_all(&self) -> Result<Vec<Task>, QueueError>;
}
