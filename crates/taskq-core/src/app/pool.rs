use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::Worker;
use crate::config::WorkerConfig;
use crate::error::ConfigError;
use crate::queue::TaskQueue;
use crate::runtime::Runtime;

/// Worker pool handle.
/// - `request_shutdown()` でワーカー全体が新規 claim を止める
/// - `shutdown_and_join()` で実行中の task を終えるまで待てる
pub struct WorkerPool {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `config.worker_count` workers sharing one queue and runtime.
    pub fn spawn(
        config: &WorkerConfig,
        queue: Arc<TaskQueue>,
        runtime: Arc<Runtime>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let worker = Worker::new(worker_id, Arc::clone(&queue), Arc::clone(&runtime), config);
            let rx = shutdown_rx.clone();
            joins.push(tokio::spawn(async move { worker.run(rx).await }));
        }

        info!(
            workers = config.worker_count,
            max_retries = config.max_retries,
            "worker pool started"
        );
        Ok(Self { shutdown_tx, joins })
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Request shutdown for all workers.
    /// This does not cancel in-flight handler execution; it just stops
    /// claiming new tasks.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            if let Err(e) = j.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }
        info!("worker pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::app::{SimulatedHandler, SimulationConfig};
    use crate::domain::{NewTask, TaskKind, TaskStatus};
    use crate::runtime::HandlerRegistry;
    use crate::testing::{ScriptedHandler, SlowHandler, wait_until_settled};

    fn config(workers: usize, max_retries: u32) -> WorkerConfig {
        WorkerConfig {
            worker_count: workers,
            max_retries,
            idle_poll_interval: Duration::from_millis(10),
            error_backoff_interval: Duration::from_millis(20),
            progress_notify_every: 3,
        }
    }

    fn runtime(handler: Arc<dyn crate::runtime::TaskHandler>) -> Arc<Runtime> {
        Arc::new(Runtime::new(Arc::new(HandlerRegistry::uniform(handler))))
    }

    #[tokio::test]
    async fn zero_workers_is_rejected() {
        let queue = Arc::new(TaskQueue::in_memory());
        let rt = runtime(ScriptedHandler::failing(0));
        let err = WorkerPool::spawn(&config(0, 3), queue, rt).err().unwrap();
        assert!(matches!(err, ConfigError::InvalidWorkerCount(0)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pool_drains_every_task_exactly_once() {
        let queue = Arc::new(TaskQueue::in_memory());
        let rt = runtime(Arc::new(SimulatedHandler::new(SimulationConfig::instant())));

        for (i, kind) in TaskKind::ALL.iter().cycle().take(20).enumerate() {
            let new = NewTask::new(format!("job-{i}"), *kind).with_priority((i % 10 + 1) as i64);
            queue.create(new).await.unwrap();
        }

        let pool = WorkerPool::spawn(&config(4, 3), Arc::clone(&queue), rt).unwrap();
        assert_eq!(pool.len(), 4);

        let stats = wait_until_settled(&queue, Duration::from_secs(10)).await;
        assert_eq!(stats.total_tasks, 20);
        assert_eq!(stats.completed, 20);
        assert_eq!(queue.ready_len().await.unwrap(), 0);
        assert!(queue.in_flight_ids().await.unwrap().is_empty());

        for task in queue.list_all(100).await.unwrap() {
            assert_eq!(task.retry_count, 0);
            assert_eq!(task.progress, 100);
        }

        pool.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn shutdown_lets_running_tasks_finish() {
        let queue = Arc::new(TaskQueue::in_memory());
        let rt = runtime(Arc::new(SlowHandler(Duration::from_millis(150))));
        let task = queue.create(NewTask::new("slow", TaskKind::ReportGeneration)).await.unwrap();

        let pool = WorkerPool::spawn(&config(1, 3), Arc::clone(&queue), rt).unwrap();

        // wait for the claim
        tokio::time::timeout(Duration::from_secs(2), async {
            while !queue.is_in_flight(task.id).await.unwrap() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        pool.shutdown_and_join().await;

        let done = queue.get(task.id).await.unwrap().unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(!queue.is_in_flight(task.id).await.unwrap());
    }

    #[tokio::test]
    async fn shutdown_stops_claiming_new_work() {
        let queue = Arc::new(TaskQueue::in_memory());
        let rt = runtime(ScriptedHandler::failing(0));
        let pool = WorkerPool::spawn(&config(2, 3), Arc::clone(&queue), rt).unwrap();
        pool.shutdown_and_join().await;

        let task = queue.create(NewTask::new("late", TaskKind::Email)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stored = queue.get(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
        assert_eq!(queue.ready_len().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn always_failing_tasks_exhaust_their_retries() {
        let queue = Arc::new(TaskQueue::in_memory());
        let handler = ScriptedHandler::always_failing();
        let rt = runtime(handler.clone());

        let a = queue.create(NewTask::new("a", TaskKind::ApiCall)).await.unwrap();
        let b = queue.create(NewTask::new("b", TaskKind::Email)).await.unwrap();

        let pool = WorkerPool::spawn(&config(2, 2), Arc::clone(&queue), rt).unwrap();
        let stats = wait_until_settled(&queue, Duration::from_secs(10)).await;
        pool.shutdown_and_join().await;

        assert_eq!(stats.failed, 2);
        assert_eq!(handler.calls(), 6);
        for id in [a.id, b.id] {
            let task = queue.get(id).await.unwrap().unwrap();
            assert_eq!(task.status, TaskStatus::Failed);
            assert_eq!(task.retry_count, 2);
            assert!(task.error.is_some());
        }
    }
}
