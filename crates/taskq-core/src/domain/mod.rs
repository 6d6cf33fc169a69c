//! Domain model: ids, task record, status machine, stats, events.

pub mod events;
pub mod ids;
pub mod state;
pub mod stats;
pub mod task;

pub use self::events::QueueEvent;
pub use self::ids::TaskId;
pub use self::state::TaskStatus;
pub use self::stats::TaskStats;
pub use self::task::{NewTask, Payload, Priority, Task, TaskKind, TaskPatch};
