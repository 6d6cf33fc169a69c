//! ReadyQueue port - 実行待ち task_id の優先度付きキュー

use async_trait::async_trait;

use crate::domain::{Priority, TaskId};
use crate::error::QueueError;

/// Priority-ordered multiset of task ids waiting to be claimed.
///
/// Holds ids only; state and payload live in the `TaskStore`.
///
/// # Contract
/// - Among equal priorities the dequeue order is unspecified. Callers must
///   not depend on submission order.
/// - `remove_highest` is a single atomic operation: two concurrent callers
///   never receive the same id. This is what keeps two workers from running
///   the same task.
#[async_trait]
pub trait ReadyQueue: Send + Sync {
    async fn insert(&self, id: TaskId, priority: Priority) -> Result<(), QueueError>;

    async fn remove_highest(&self) -> Result<Option<TaskId>, QueueError>;

    async fn len(&self) -> Result<usize, QueueError>;
}
