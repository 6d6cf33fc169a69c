//! ChangeNotifier port - 変更通知の抽象化

use crate::domain::TaskId;

/// Sink for "something changed" signals.
///
/// Fire-and-forget: implementations must return promptly and must swallow
/// their own delivery failures. Nothing in the task pipeline waits on or
/// reacts to a notification.
pub trait ChangeNotifier: Send + Sync {
    fn notify_task_changed(&self, id: TaskId);

    fn notify_stats_changed(&self);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn notify_task_changed(&self, _id: TaskId) {}

    fn notify_stats_changed(&self) {}
}
