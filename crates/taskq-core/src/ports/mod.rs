//! Ports - 抽象化レイヤー
//!
//! Each trait is a seam to an external system: the record store, the ready
//! queue and the in-flight set could be backed by Redis or a database, the
//! notifier by a websocket fan-out. `impls` provides in-memory versions.

pub mod clock;
pub mod id_generator;
pub mod in_flight;
pub mod notifier;
pub mod ready_queue;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::in_flight::InFlightSet;
pub use self::notifier::{ChangeNotifier, NoopNotifier};
pub use self::ready_queue::ReadyQueue;
pub use self::task_store::TaskStore;
