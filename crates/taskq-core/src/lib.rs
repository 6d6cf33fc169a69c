//! taskq-core
//!
//! Core building blocks for the priority task queue.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, state, stats, events）
//! - **ports**: 抽象化レイヤー（TaskStore, ReadyQueue, InFlightSet, ChangeNotifier, Clock, IdGenerator）
//! - **impls**: 実装（in-memory の store / ready queue / in-flight set、broadcast notifier）
//! - **queue**: `TaskQueue` ファサードと RetryPolicy
//! - **runtime**: TaskHandler と kind ごとの HandlerRegistry
//! - **app**: Worker, WorkerPool, ProgressReporter, SimulatedHandler
//! - **config** / **error**: 設定とエラー型

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{ProgressReporter, SimulatedHandler, SimulationConfig, Worker, WorkerPool};
pub use config::{QueueConfig, WorkerConfig};
pub use domain::{NewTask, Priority, QueueEvent, Task, TaskId, TaskKind, TaskStats, TaskStatus};
pub use error::{ConfigError, ExecutionError, QueueError};
pub use queue::{DEFAULT_LIST_LIMIT, TaskQueue};
pub use runtime::{HandlerRegistry, Runtime, TaskHandler};
