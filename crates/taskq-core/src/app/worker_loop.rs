//! WorkerLoop - タスク実行ループ
//!
//! # フロー
//! 1. `TaskQueue::claim_next()` で task_id 取得（空なら idle 待ち）
//! 2. PROCESSING に更新して通知
//! 3. Runtime で kind ごとの handler を実行（progress は ProgressReporter 経由）
//! 4. 成功 → `mark_completed`、失敗 → RetryPolicy で requeue か `mark_failed`
//!
//! 2 と 4 の store 書き込みが一時障害で失敗した場合は backoff 後に再試行する。
//! claim 済みの task を途中で手放さない。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::ProgressReporter;
use crate::config::WorkerConfig;
use crate::domain::{TaskId, TaskPatch, TaskStatus};
use crate::error::{ExecutionError, QueueError};
use crate::queue::{RetryDecision, RetryPolicy, TaskQueue};
use crate::runtime::Runtime;

/// One execution unit. Processes a single task at a time.
pub struct Worker {
    id: usize,
    queue: Arc<TaskQueue>,
    runtime: Arc<Runtime>,
    policy: RetryPolicy,
    idle_poll_interval: Duration,
    error_backoff_interval: Duration,
    progress_notify_every: u32,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: Arc<TaskQueue>,
        runtime: Arc<Runtime>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            id,
            queue,
            runtime,
            policy: RetryPolicy::new(config.max_retries),
            idle_poll_interval: config.idle_poll_interval,
            error_backoff_interval: config.error_backoff_interval,
            progress_notify_every: config.progress_notify_every,
        }
    }

    /// Run until shutdown is requested (or the sender is dropped).
    ///
    /// Shutdown is only observed between tasks; a task already claimed runs
    /// to completion or failure.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(worker_id = self.id, "worker starting");
        loop {
            // shutdown が来ていたら抜ける
            if *shutdown.borrow() {
                break;
            }

            let (pause, idle) = match self.run_once().await {
                Ok(true) => continue,
                Ok(false) => (self.idle_poll_interval, true),
                Err(e) => {
                    error!(worker_id = self.id, error = %e, "worker loop fault, backing off");
                    (self.error_backoff_interval, false)
                }
            };

            // 待機中はロックを持たない。idle のときだけ新規 task で起きる
            let stop = tokio::select! {
                changed = shutdown.changed() => changed.is_err(),
                _ = self.queue.work_ready(), if idle => false,
                _ = tokio::time::sleep(pause) => false,
            };
            if stop {
                break;
            }
        }
        info!(worker_id = self.id, "worker stopped");
    }

    /// Claim and process at most one task. `Ok(false)` when the queue was
    /// empty. Errors are infrastructure faults; execution failures are
    /// handled inside.
    pub async fn run_once(&self) -> Result<bool, QueueError> {
        let Some(task_id) = self.queue.claim_next().await? else {
            return Ok(false);
        };
        self.process(task_id).await?;
        Ok(true)
    }

    /// Execute one claimed task end-to-end.
    ///
    /// Store faults while starting or resolving the task are retried after
    /// `error_backoff_interval` until they clear.
    pub async fn process(&self, task_id: TaskId) -> Result<(), QueueError> {
        let started = TaskPatch::default()
            .status(TaskStatus::Processing)
            .started_at(self.queue.now());
        let begun = self
            .retrying("start", task_id, move || {
                self.queue.update(task_id, started.clone())
            })
            .await;
        let task = match begun {
            Ok(Some(task)) => task,
            Ok(None) => {
                warn!(worker_id = self.id, task_id = %task_id, "claimed task has no record, releasing");
                self.queue.release(task_id).await?;
                return Ok(());
            }
            Err(QueueError::InvalidTransition { from, .. }) => {
                warn!(worker_id = self.id, task_id = %task_id, status = %from, "claimed task is not startable, releasing");
                self.queue.release(task_id).await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        info!(worker_id = self.id, task_id = %task_id, kind = %task.kind, "processing task");
        self.notify(task_id);

        let mut progress =
            ProgressReporter::new(Arc::clone(&self.queue), task_id, self.progress_notify_every);
        let outcome = self.runtime.execute(&task, &mut progress).await;
        if let Err(err) = &outcome {
            warn!(worker_id = self.id, task_id = %task_id, error = %err, "task attempt failed");
        }

        let outcome = &outcome;
        let resolved = self
            .retrying("resolve", task_id, move || self.resolve(task_id, outcome))
            .await;
        match resolved {
            Ok(()) => {}
            Err(QueueError::InvalidTransition { from, to, .. }) => {
                warn!(worker_id = self.id, task_id = %task_id, %from, %to, "task changed under the worker, releasing");
                self.queue.release(task_id).await?;
            }
            Err(e) => return Err(e),
        }
        self.notify(task_id);
        Ok(())
    }

    /// Repeat `op` while it fails with a retryable fault.
    async fn retrying<T, F, Fut>(
        &self,
        step: &str,
        task_id: TaskId,
        mut op: F,
    ) -> Result<T, QueueError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, QueueError>>,
    {
        loop {
            match op().await {
                Err(e) if e.is_retryable() => {
                    warn!(worker_id = self.id, task_id = %task_id, step, error = %e, "store fault, retrying");
                    tokio::time::sleep(self.error_backoff_interval).await;
                }
                other => return other,
            }
        }
    }

    async fn resolve(
        &self,
        task_id: TaskId,
        outcome: &Result<(), ExecutionError>,
    ) -> Result<(), QueueError> {
        match outcome {
            Ok(()) => {
                self.queue.mark_completed(task_id).await?;
                info!(worker_id = self.id, task_id = %task_id, "task completed");
                Ok(())
            }
            Err(err) => self.resolve_failure(task_id, err).await,
        }
    }

    async fn resolve_failure(
        &self,
        task_id: TaskId,
        err: &ExecutionError,
    ) -> Result<(), QueueError> {
        let message = err.to_string();

        // re-read: retry_count is the store's, not our copy's
        let Some(task) = self.queue.get(task_id).await? else {
            self.queue.release(task_id).await?;
            return Ok(());
        };

        // RETRYING here means an earlier requeue landed its record only
        let decision = if task.status == TaskStatus::Retrying {
            RetryDecision::Requeue
        } else {
            self.policy.decide(task.retry_count)
        };

        match decision {
            RetryDecision::Requeue => {
                self.queue
                    .update(task_id, TaskPatch::default().error(message))
                    .await?;
                let attempt = self
                    .queue
                    .requeue(task_id, task.priority)
                    .await?
                    .map_or(task.retry_count, |t| t.retry_count);
                info!(
                    worker_id = self.id,
                    task_id = %task_id,
                    attempt,
                    max_retries = self.policy.max_retries,
                    "task requeued for retry"
                );
            }
            RetryDecision::Fail => {
                self.queue.mark_failed(task_id, message).await?;
                info!(
                    worker_id = self.id,
                    task_id = %task_id,
                    retries = task.retry_count,
                    "task failed permanently"
                );
            }
        }
        Ok(())
    }

    fn notify(&self, task_id: TaskId) {
        debug!(worker_id = self.id, task_id = %task_id, "notifying observers");
        let notifier = self.queue.notifier();
        notifier.notify_task_changed(task_id);
        notifier.notify_stats_changed();
    }
}
