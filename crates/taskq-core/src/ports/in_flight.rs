//! InFlightSet port - worker が claim 中の task_id 集合

use async_trait::async_trait;

use crate::domain::TaskId;
use crate::error::QueueError;

/// Membership set of ids currently claimed by a worker.
/// Each operation is atomic on its own.
#[async_trait]
pub trait InFlightSet: Send + Sync {
    async fn add(&self, id: TaskId) -> Result<(), QueueError>;

    /// Returns whether the id was a member.
    async fn remove(&self, id: TaskId) -> Result<bool, QueueError>;

    async fn contains(&self, id: TaskId) -> Result<bool, QueueError>;

    async fn members(&self) -> Result<Vec<TaskId>, QueueError>;
}
