//! Queue module: the task lifecycle facade and the retry policy.
//!
//! `TaskQueue` is the only code that mutates the record store, the ready
//! queue and the in-flight set together. Keeping the three consistent is its
//! whole job:
//!
//! - in the ready queue  <=> status is PENDING or RETRYING
//! - in the in-flight set <=> status is PROCESSING
//!
//! Known gap: `claim_next` pops from the ready queue and then adds to the
//! in-flight set in two steps. A crash between them, or a crash of the worker
//! any time before it resolves the task, leaves the task owned by nobody.
//! Nothing here reaps such claims.

mod retry;

pub use retry::{RetryDecision, RetryPolicy};

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::domain::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStats, TaskStatus};
use crate::error::QueueError;
use crate::impls::{InMemoryInFlightSet, InMemoryReadyQueue, InMemoryTaskStore};
use crate::ports::{
    ChangeNotifier, Clock, IdGenerator, InFlightSet, NoopNotifier, ReadyQueue, SystemClock,
    TaskStore, UlidGenerator,
};

/// Default page size for listings.
pub const DEFAULT_LIST_LIMIT: usize = 100;

pub struct TaskQueue {
    store: Arc<dyn TaskStore>,
    ready: Arc<dyn ReadyQueue>,
    in_flight: Arc<dyn InFlightSet>,
    notifier: Arc<dyn ChangeNotifier>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    config: QueueConfig,
    /// Signalled whenever an id enters the ready queue.
    work_ready: Notify,
}

impl TaskQueue {
    pub fn new(
        store: Arc<dyn TaskStore>,
        ready: Arc<dyn ReadyQueue>,
        in_flight: Arc<dyn InFlightSet>,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            store,
            ready,
            in_flight,
            notifier: Arc::new(NoopNotifier),
            ids: Arc::new(UlidGenerator::new(Arc::clone(&clock))),
            clock,
            config: QueueConfig::default(),
            work_ready: Notify::new(),
        }
    }

    /// Process-local queue backed by the in-memory implementations.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(InMemoryReadyQueue::new()),
            Arc::new(InMemoryInFlightSet::new()),
        )
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replaces the clock used for timestamps and for id generation.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn notifier(&self) -> &Arc<dyn ChangeNotifier> {
        &self.notifier
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Validate, persist as PENDING, then make it claimable.
    ///
    /// The record is written before the id enters the ready queue so a
    /// claimer never sees an id without a record.
    pub async fn create(&self, new: NewTask) -> Result<Task, QueueError> {
        let priority = Priority::new(new.priority)?;
        let id = self.ids.generate_task_id();
        let task = Task::new(id, new.name, new.kind, new.payload, priority, self.clock.now());

        self.store.put(&task).await?;
        self.ready.insert(id, priority).await?;
        self.work_ready.notify_one();

        debug!(task_id = %id, kind = %task.kind, priority = %priority, "task created");
        self.notifier.notify_task_changed(id);
        self.notifier.notify_stats_changed();
        Ok(task)
    }

    pub async fn get(&self, id: TaskId) -> Result<Option<Task>, QueueError> {
        self.store.get(id).await
    }

    /// Merge-update the mutable fields. `None` when the id is unknown.
    ///
    /// A status change must be an edge of the state machine; anything else
    /// is `InvalidTransition` and nothing is written.
    pub async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Option<Task>, QueueError> {
        let Some(mut task) = self.store.get(id).await? else {
            return Ok(None);
        };
        if let Some(next) = patch.status {
            if next != task.status {
                check_transition(&task, next)?;
            }
        }
        task.apply(&patch, self.clock.now());
        self.store.put(&task).await?;
        Ok(Some(task))
    }

    /// Claim the highest-priority ready task.
    ///
    /// Exclusivity comes from the ready queue's atomic pop alone; the
    /// in-flight insert afterwards is bookkeeping.
    pub async fn claim_next(&self) -> Result<Option<TaskId>, QueueError> {
        let Some(id) = self.ready.remove_highest().await? else {
            return Ok(None);
        };
        if let Err(e) = self.in_flight.add(id).await {
            warn!(task_id = %id, error = %e, "claimed task could not be marked in-flight");
            return Err(e);
        }
        Ok(Some(id))
    }

    /// Drop a claim without touching the record. For claimed ids whose
    /// record is gone or no longer startable.
    pub async fn release(&self, id: TaskId) -> Result<bool, QueueError> {
        let released = self.in_flight.remove(id).await?;
        if released {
            debug!(task_id = %id, "claim released");
        }
        Ok(released)
    }

    pub async fn mark_completed(&self, id: TaskId) -> Result<Option<Task>, QueueError> {
        let patch = TaskPatch::default()
            .status(TaskStatus::Completed)
            .progress(100)
            .completed_at(self.clock.now());
        self.finish(id, patch).await
    }

    pub async fn mark_failed(
        &self,
        id: TaskId,
        error: impl Into<String>,
    ) -> Result<Option<Task>, QueueError> {
        let patch = TaskPatch::default()
            .status(TaskStatus::Failed)
            .error(error)
            .completed_at(self.clock.now());
        self.finish(id, patch).await
    }

    /// Move a PROCESSING task to a terminal status.
    ///
    /// The record is written before the claim is dropped: if the write fails
    /// the task is still PROCESSING and in flight, and the call can be
    /// repeated. A repeat after the write landed only drops the claim.
    async fn finish(&self, id: TaskId, patch: TaskPatch) -> Result<Option<Task>, QueueError> {
        let Some(mut task) = self.store.get(id).await? else {
            self.in_flight.remove(id).await?;
            return Ok(None);
        };
        let to = patch.status.unwrap_or(task.status);

        if task.status == to && self.in_flight.contains(id).await? {
            self.in_flight.remove(id).await?;
            return Ok(Some(task));
        }
        check_transition(&task, to)?;

        task.apply(&patch, self.clock.now());
        self.store.put(&task).await?;
        self.in_flight.remove(id).await?;
        Ok(Some(task))
    }

    /// Send a failed task back for another attempt.
    ///
    /// Does not check the retry bound; that is the caller's `RetryPolicy`.
    /// The record is updated before the id re-enters the ready queue so a
    /// fast claimer cannot have its PROCESSING overwritten with RETRYING.
    /// If the ready-queue insert fails the claim is restored; repeating the
    /// call then finishes the move without counting a second retry.
    pub async fn requeue(
        &self,
        id: TaskId,
        priority: Priority,
    ) -> Result<Option<Task>, QueueError> {
        let Some(mut task) = self.store.get(id).await? else {
            self.in_flight.remove(id).await?;
            return Ok(None);
        };

        // RETRYING but still claimed: an earlier requeue wrote the record
        // and stopped short of the ready queue
        let resumed = task.status == TaskStatus::Retrying && self.in_flight.contains(id).await?;
        if !resumed {
            check_transition(&task, TaskStatus::Retrying)?;
            task.retry_count += 1;
            task.status = TaskStatus::Retrying;
            task.updated_at = self.clock.now();
            self.store.put(&task).await?;
        }

        self.in_flight.remove(id).await?;
        if let Err(e) = self.ready.insert(id, priority).await {
            if let Err(undo) = self.in_flight.add(id).await {
                warn!(task_id = %id, error = %undo, "could not restore claim after failed requeue");
            }
            return Err(e);
        }
        self.work_ready.notify_one();
        Ok(Some(task))
    }

    /// Newest first, at most `limit` records.
    pub async fn list_all(&self, limit: usize) -> Result<Vec<Task>, QueueError> {
        let mut tasks = self.store.scan_all().await?;
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        tasks.truncate(limit);
        Ok(tasks)
    }

    /// Counts per status, recomputed on every call.
    pub async fn stats(&self) -> Result<TaskStats, QueueError> {
        let tasks = self.list_all(self.config.stats_scan_limit).await?;
        Ok(TaskStats::from_tasks(&tasks))
    }

    pub async fn ready_len(&self) -> Result<usize, QueueError> {
        self.ready.len().await
    }

    pub async fn in_flight_ids(&self) -> Result<Vec<TaskId>, QueueError> {
        self.in_flight.members().await
    }

    pub async fn is_in_flight(&self, id: TaskId) -> Result<bool, QueueError> {
        self.in_flight.contains(id).await
    }

    /// Resolves after the next create/requeue (or immediately if one happened
    /// since the last waiter). Idle workers race this against their poll
    /// interval.
    pub fn work_ready(&self) -> Notified<'_> {
        self.work_ready.notified()
    }
}

fn check_transition(task: &Task, to: TaskStatus) -> Result<(), QueueError> {
    if task.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(QueueError::InvalidTransition {
            id: task.id,
            from: task.status,
            to,
        })
    }
}
