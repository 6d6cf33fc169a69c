//! BroadcastNotifier - tokio broadcast による変更通知の fan-out

use tokio::sync::broadcast;

use crate::domain::{QueueEvent, TaskId};
use crate::ports::ChangeNotifier;

/// Fans queue events out to any number of subscribers.
///
/// `broadcast::Sender::send` never waits. With no subscribers the event is
/// dropped; a subscriber that falls more than `capacity` events behind gets
/// `RecvError::Lagged` and skips ahead. Neither case reaches the workers.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<QueueEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    fn publish(&self, event: QueueEvent) {
        // no receivers is not an error for us
        let _ = self.tx.send(event);
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn notify_task_changed(&self, id: TaskId) {
        self.publish(QueueEvent::TaskChanged(id));
    }

    fn notify_stats_changed(&self) {
        self.publish(QueueEvent::StatsChanged);
    }
}
