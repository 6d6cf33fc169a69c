use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::app::ProgressReporter;
use crate::domain::{Task, TaskKind};
use crate::error::ExecutionError;

/// Executes tasks of one or more kinds.
///
/// Takes the whole record so the handler can read `payload` however it
/// likes. Progress goes through `progress`; returning `Err` sends the task
/// down the retry-or-fail path.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(
        &self,
        task: &Task,
        progress: &mut ProgressReporter,
    ) -> Result<(), ExecutionError>;
}

/// Registry of handlers (kind -> handler).
///
/// Built during initialization (mutable), used during runtime (immutable),
/// so no locks.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskKind, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// One handler serving every kind.
    pub fn uniform(handler: Arc<dyn TaskHandler>) -> Self {
        let handlers = TaskKind::ALL
            .into_iter()
            .map(|kind| (kind, Arc::clone(&handler)))
            .collect();
        Self { handlers }
    }

    pub fn register(
        &mut self,
        kind: TaskKind,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<(), ExecutionError> {
        if self.handlers.contains_key(&kind) {
            return Err(ExecutionError::DuplicateHandler(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn get(&self, kind: TaskKind) -> Option<&Arc<dyn TaskHandler>> {
        self.handlers.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Runtime executes a task by dispatching on its kind.
pub struct Runtime {
    registry: Arc<HandlerRegistry>,
}

impl Runtime {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// A kind without a handler is an execution failure like any other.
    pub async fn execute(
        &self,
        task: &Task,
        progress: &mut ProgressReporter,
    ) -> Result<(), ExecutionError> {
        let handler = self
            .registry
            .get(task.kind)
            .ok_or(ExecutionError::HandlerNotFound(task.kind))?;

        handler.handle(task, progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewTask;
    use crate::queue::TaskQueue;
    use crate::testing::ScriptedHandler;

    async fn claimed(queue: &Arc<TaskQueue>, kind: TaskKind) -> (Task, ProgressReporter) {
        let task = queue.create(NewTask::new("t", kind)).await.unwrap();
        let reporter = ProgressReporter::new(Arc::clone(queue), task.id, 3);
        (task, reporter)
    }

    #[tokio::test]
    async fn runtime_executes_registered_handler() {
        let handler = ScriptedHandler::failing(0);
        let mut reg = HandlerRegistry::new();
        reg.register(TaskKind::Email, handler.clone()).unwrap();
        let rt = Runtime::new(Arc::new(reg));

        let queue = Arc::new(TaskQueue::in_memory());
        let (task, mut progress) = claimed(&queue, TaskKind::Email).await;
        rt.execute(&task, &mut progress).await.unwrap();

        assert_eq!(handler.calls(), 1);
    }

    #[tokio::test]
    async fn runtime_errors_when_handler_missing() {
        let rt = Runtime::new(Arc::new(HandlerRegistry::new()));

        let queue = Arc::new(TaskQueue::in_memory());
        let (task, mut progress) = claimed(&queue, TaskKind::ApiCall).await;
        let err = rt.execute(&task, &mut progress).await.unwrap_err();

        assert!(matches!(err, ExecutionError::HandlerNotFound(TaskKind::ApiCall)));
        assert!(err.to_string().contains("handler"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut reg = HandlerRegistry::new();
        reg.register(TaskKind::Email, ScriptedHandler::failing(0)).unwrap();
        let err = reg
            .register(TaskKind::Email, ScriptedHandler::failing(0))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::DuplicateHandler(TaskKind::Email)));
    }

    #[test]
    fn uniform_registry_covers_every_kind() {
        let reg = HandlerRegistry::uniform(ScriptedHandler::failing(0));
        assert_eq!(reg.len(), TaskKind::ALL.len());
        for kind in TaskKind::ALL {
            assert!(reg.get(kind).is_some());
        }
    }
}
