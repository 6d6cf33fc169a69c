//! InMemoryTaskStore - 開発用の record store
//!
//! Records are kept serialized, the way a key-value store would hold them.
//! Every `put` swaps the whole document under the write lock, so a reader
//! sees either the old or the new record, never a mix.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::poisoned;
use crate::domain::{Task, TaskId};
use crate::error::QueueError;
use crate::ports::TaskStore;

#[derive(Default)]
pub struct InMemoryTaskStore {
    records: RwLock<HashMap<TaskId, String>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn decode(id: TaskId, raw: &str) -> Result<Task, QueueError> {
    serde_json::from_str(raw).map_err(|source| QueueError::CorruptRecord { id, source })
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn put(&self, task: &Task) -> Result<(), QueueError> {
        let raw = serde_json::to_string(task)
            .map_err(|source| QueueError::CorruptRecord { id: task.id, source })?;
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(task.id, raw);
        Ok(())
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, QueueError> {
        let records = self.records.read().map_err(poisoned)?;
        records.get(&id).map(|raw| decode(id, raw)).transpose()
    }

    async fn scan_all(&self) -> Result<Vec<Task>, QueueError> {
        // Copy the documents out first; decoding happens without the lock.
        let snapshot: Vec<(TaskId, String)> = {
            let records = self.records.read().map_err(poisoned)?;
            records.iter().map(|(id, raw)| (*id, raw.clone())).collect()
        };
        snapshot.iter().map(|(id, raw)| decode(*id, raw)).collect()
    }
}
