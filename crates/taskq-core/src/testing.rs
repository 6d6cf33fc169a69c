//! Test doubles shared by the unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::app::ProgressReporter;
use crate::domain::{Priority, Task, TaskId, TaskStats};
use crate::error::{ExecutionError, QueueError};
use crate::impls::{InMemoryReadyQueue, InMemoryTaskStore};
use crate::ports::{ReadyQueue, TaskStore};
use crate::queue::TaskQueue;
use crate::runtime::TaskHandler;

fn down_error() -> QueueError {
    QueueError::StoreUnavailable("connection refused".to_string())
}

/// Record store that can be switched off.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryTaskStore,
    down: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), QueueError> {
        if self.down.load(Ordering::SeqCst) {
            Err(down_error())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TaskStore for FlakyStore {
    async fn put(&self, task: &Task) -> Result<(), QueueError> {
        self.check()?;
        self.inner.put(task).await
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, QueueError> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn scan_all(&self) -> Result<Vec<Task>, QueueError> {
        self.check()?;
        self.inner.scan_all().await
    }
}

/// Ready queue whose pops and inserts can be switched off separately.
#[derive(Default)]
pub struct FlakyReadyQueue {
    inner: InMemoryReadyQueue,
    down: AtomicBool,
    inserts_down: AtomicBool,
    failed_pops: AtomicU32,
}

impl FlakyReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn set_inserts_down(&self, down: bool) {
        self.inserts_down.store(down, Ordering::SeqCst);
    }

    pub fn failed_pops(&self) -> u32 {
        self.failed_pops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadyQueue for FlakyReadyQueue {
    async fn insert(&self, id: TaskId, priority: Priority) -> Result<(), QueueError> {
        if self.inserts_down.load(Ordering::SeqCst) {
            return Err(down_error());
        }
        self.inner.insert(id, priority).await
    }

    async fn remove_highest(&self) -> Result<Option<TaskId>, QueueError> {
        if self.down.load(Ordering::SeqCst) {
            self.failed_pops.fetch_add(1, Ordering::SeqCst);
            return Err(down_error());
        }
        self.inner.remove_highest().await
    }

    async fn len(&self) -> Result<usize, QueueError> {
        self.inner.len().await
    }
}

/// Fails the first `failures` calls, then succeeds. `u32::MAX` never succeeds.
pub struct ScriptedHandler {
    remaining_failures: AtomicU32,
    calls: AtomicU32,
}

impl ScriptedHandler {
    pub fn failing(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            remaining_failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        })
    }

    pub fn always_failing() -> Arc<Self> {
        Self::failing(u32::MAX)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskHandler for ScriptedHandler {
    async fn handle(
        &self,
        _task: &Task,
        progress: &mut ProgressReporter,
    ) -> Result<(), ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        progress.report(1, 2).await?;

        let left = self.remaining_failures.load(Ordering::SeqCst);
        if left > 0 {
            if left != u32::MAX {
                self.remaining_failures.fetch_sub(1, Ordering::SeqCst);
            }
            return Err(ExecutionError::Failed(format!("intentional failure (left={left})")));
        }
        progress.report(2, 2).await?;
        Ok(())
    }
}

/// Sleeps for a fixed time, then succeeds.
pub struct SlowHandler(pub Duration);

#[async_trait]
impl TaskHandler for SlowHandler {
    async fn handle(
        &self,
        _task: &Task,
        progress: &mut ProgressReporter,
    ) -> Result<(), ExecutionError> {
        tokio::time::sleep(self.0).await;
        progress.report(1, 1).await?;
        Ok(())
    }
}

/// Poll `stats()` until nothing is pending, running or retrying.
pub async fn wait_until_settled(queue: &TaskQueue, timeout: Duration) -> TaskStats {
    tokio::time::timeout(timeout, async {
        loop {
            let stats = queue.stats().await.unwrap();
            if stats.total_tasks > 0 && stats.is_settled() {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("queue did not settle in time")
}
