//! InMemoryInFlightSet - claim 中の task_id 集合

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::poisoned;
use crate::domain::TaskId;
use crate::error::QueueError;
use crate::ports::InFlightSet;

#[derive(Default)]
pub struct InMemoryInFlightSet {
    ids: Mutex<HashSet<TaskId>>,
}

impl InMemoryInFlightSet {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InFlightSet for InMemoryInFlightSet {
    async fn add(&self, id: TaskId) -> Result<(), QueueError> {
        self.ids.lock().map_err(poisoned)?.insert(id);
        Ok(())
    }

    async fn remove(&self, id: TaskId) -> Result<bool, QueueError> {
        Ok(self.ids.lock().map_err(poisoned)?.remove(&id))
    }

    async fn contains(&self, id: TaskId) -> Result<bool, QueueError> {
        Ok(self.ids.lock().map_err(poisoned)?.contains(&id))
    }

    async fn members(&self) -> Result<Vec<TaskId>, QueueError> {
        Ok(self.ids.lock().map_err(poisoned)?.iter().copied().collect())
    }
}
