//! App - アプリケーション層
//!
//! このモジュールは、`TaskQueue` と `Runtime` を組み合わせて実行ロジックを実装します。
//!
//! # 主要コンポーネント
//! - **Worker**: タスク実行ループ（claim→PROCESSING→handle→complete / retry / fail）
//! - **WorkerPool**: Worker 群の起動と graceful shutdown
//! - **ProgressReporter**: handler からの進捗報告（間引き通知つき）
//! - **SimulatedHandler**: 段階的な擬似処理（デモ・負荷確認用）

pub mod pool;
pub mod progress;
pub mod simulated;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::pool::WorkerPool;
pub use self::progress::ProgressReporter;
pub use self::simulated::{SimulatedHandler, SimulationConfig};
pub use self::worker_loop::Worker;
