//! InMemoryReadyQueue - 優先度付き ready queue
//!
//! A max-heap behind a single mutex. `remove_highest` pops under that lock,
//! which is the atomic primitive the claim protocol relies on.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::poisoned;
use crate::domain::{Priority, TaskId};
use crate::error::QueueError;
use crate::ports::ReadyQueue;

/// Heap entry. Ordered by priority, then by the smaller (older) id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ReadyEntry {
    priority: Priority,
    id: Reverse<TaskId>,
}

#[derive(Default)]
pub struct InMemoryReadyQueue {
    heap: Mutex<BinaryHeap<ReadyEntry>>,
}

impl InMemoryReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadyQueue for InMemoryReadyQueue {
    async fn insert(&self, id: TaskId, priority: Priority) -> Result<(), QueueError> {
        let mut heap = self.heap.lock().map_err(poisoned)?;
        heap.push(ReadyEntry {
            priority,
            id: Reverse(id),
        });
        Ok(())
    }

    async fn remove_highest(&self) -> Result<Option<TaskId>, QueueError> {
        let mut heap = self.heap.lock().map_err(poisoned)?;
        Ok(heap.pop().map(|e| e.id.0))
    }

    async fn len(&self) -> Result<usize, QueueError> {
        let heap = self.heap.lock().map_err(poisoned)?;
        Ok(heap.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use ulid::Ulid;

    fn id() -> TaskId {
        TaskId::from_ulid(Ulid::new())
    }

    fn p(v: i64) -> Priority {
        Priority::new(v).unwrap()
    }

    #[tokio::test]
    async fn pops_highest_priority_first() {
        let q = InMemoryReadyQueue::new();
        let (low, mid, high) = (id(), id(), id());
        q.insert(low, p(1)).await.unwrap();
        q.insert(high, p(10)).await.unwrap();
        q.insert(mid, p(5)).await.unwrap();

        assert_eq!(q.remove_highest().await.unwrap(), Some(high));
        assert_eq!(q.remove_highest().await.unwrap(), Some(mid));
        assert_eq!(q.remove_highest().await.unwrap(), Some(low));
        assert_eq!(q.remove_highest().await.unwrap(), None);
    }

    #[tokio::test]
    async fn equal_priorities_pop_oldest_id_first() {
        let q = InMemoryReadyQueue::new();
        let older = TaskId::from_ulid(Ulid::from_parts(1_000, 7));
        let newer = TaskId::from_ulid(Ulid::from_parts(2_000, 1));
        q.insert(newer, p(4)).await.unwrap();
        q.insert(older, p(4)).await.unwrap();
        assert_eq!(q.len().await.unwrap(), 2);

        assert_eq!(q.remove_highest().await.unwrap(), Some(older));
        assert_eq!(q.remove_highest().await.unwrap(), Some(newer));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_pops_never_share_an_id() {
        let q = Arc::new(InMemoryReadyQueue::new());
        for i in 0..200 {
            q.insert(id(), p(i % 10 + 1)).await.unwrap();
        }

        let mut joins = Vec::new();
        for _ in 0..16 {
            let q = Arc::clone(&q);
            joins.push(tokio::spawn(async move {
                let mut got = Vec::new();
                while let Some(id) = q.remove_highest().await.unwrap() {
                    got.push(id);
                }
                got
            }));
        }

        let mut seen = HashSet::new();
        let mut total = 0;
        for j in joins {
            for id in j.await.unwrap() {
                total += 1;
                assert!(seen.insert(id), "{id} popped twice");
            }
        }
        assert_eq!(total, 200);
    }
}
