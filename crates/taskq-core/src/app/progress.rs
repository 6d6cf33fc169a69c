//! Progress reporting handed to task handlers.

use std::sync::Arc;

use crate::domain::{TaskId, TaskPatch};
use crate::error::QueueError;
use crate::queue::TaskQueue;

/// Writes a running task's progress through `TaskQueue::update`.
///
/// Every report is persisted; observers are only told about the first
/// step, every `notify_every`-th step after it, and the final step.
pub struct ProgressReporter {
    queue: Arc<TaskQueue>,
    task_id: TaskId,
    notify_every: u32,
    last: u8,
}

impl ProgressReporter {
    pub fn new(queue: Arc<TaskQueue>, task_id: TaskId, notify_every: u32) -> Self {
        Self {
            queue,
            task_id,
            notify_every: notify_every.max(1),
            last: 0,
        }
    }

    /// Last progress value written.
    pub fn current(&self) -> u8 {
        self.last
    }

    /// Record that `step` of `total` steps is done. Progress never goes
    /// backwards. Returns the value written.
    pub async fn report(&mut self, step: u32, total: u32) -> Result<u8, QueueError> {
        let total = total.max(1);
        let step = step.min(total);
        let progress = ((step as u64 * 100) / total as u64) as u8;
        let progress = progress.max(self.last);

        self.queue
            .update(self.task_id, TaskPatch::default().progress(progress))
            .await?;
        self.last = progress;

        if step.saturating_sub(1) % self.notify_every == 0 || step == total {
            self.queue.notifier().notify_task_changed(self.task_id);
        }
        Ok(progress)
    }
}
