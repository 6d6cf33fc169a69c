//! Impls - in-memory implementations of the ports
//!
//! Process-local backends: every structure guards its state with a single
//! lock and never holds it across an `.await`.

pub mod broadcast_notifier;
pub mod memory_in_flight;
pub mod memory_ready;
pub mod memory_store;

pub use self::broadcast_notifier::BroadcastNotifier;
pub use self::memory_in_flight::InMemoryInFlightSet;
pub use self::memory_ready::InMemoryReadyQueue;
pub use self::memory_store::InMemoryTaskStore;

use std::sync::PoisonError;

use crate::error::QueueError;

/// A poisoned lock means a writer panicked mid-update; report the backend as
/// unavailable rather than trust its contents.
pub(crate) fn poisoned<T>(err: PoisonError<T>) -> QueueError {
    QueueError::StoreUnavailable(format!("lock poisoned: {err}"))
}
