//! Retry policy: decides whether a failed attempt goes back to the queue.

/// What to do with a task whose execution just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Put it back in the ready queue (at its original priority).
    Requeue,
    /// Give up: the task becomes FAILED.
    Fail,
}

/// Retry policy for failed tasks.
///
/// Owned by the execution layer. The queue facade never checks the bound
/// itself, so the value lives here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// # Arguments
    /// * `retry_count` - Requeues the task has already been through.
    ///
    /// A task may be requeued while `retry_count < max_retries`; the failure
    /// that finds `retry_count == max_retries` is final.
    pub fn decide(&self, retry_count: u32) -> RetryDecision {
        if retry_count < self.max_retries {
            RetryDecision::Requeue
        } else {
            RetryDecision::Fail
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
