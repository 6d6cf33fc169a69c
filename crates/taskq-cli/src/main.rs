//! taskq: runs an in-process priority task queue with a worker pool.
//!
//! Subcommands:
//! - `run`    submit a batch of simulated tasks and wait for all of them
//! - `submit` submit one task and wait for it

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use rand::Rng;
use rand::seq::SliceRandom;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use taskq_core::domain::Payload;
use taskq_core::impls::BroadcastNotifier;
use taskq_core::{
    HandlerRegistry, NewTask, QueueEvent, Runtime, SimulatedHandler, Task, TaskId, TaskKind,
    TaskQueue, TaskStats, WorkerPool,
};

use crate::config::{PoolArgs, SimulationArgs};

// ── CLI ─────────────────────────────────────────────────────────────

/// In-process priority task queue with retrying workers.
#[derive(Parser, Debug)]
#[command(name = "taskq", version, about)]
struct Cli {
    #[command(flatten)]
    pool: PoolArgs,

    #[command(flatten)]
    simulation: SimulationArgs,

    /// Give up waiting after this many seconds.
    #[arg(long, env = "TASKQ_TIMEOUT_SECS", default_value_t = 300, global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit demo tasks with random kinds and priorities, wait, print stats.
    Run {
        /// Number of tasks to submit.
        #[arg(long, default_value_t = 20)]
        tasks: usize,
    },

    /// Submit one task, wait until it is terminal, print its record.
    Submit {
        #[arg(long)]
        name: String,

        /// email | data_processing | file_conversion | api_call | report_generation
        #[arg(long)]
        kind: TaskKind,

        #[arg(long, default_value_t = 5)]
        priority: i64,

        /// JSON object handed to the handler.
        #[arg(long, default_value = "{}")]
        payload: String,
    },
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let worker_config = cli.pool.worker_config()?;
    let simulation = cli.simulation.simulation_config()?;
    let timeout = Duration::from_secs(cli.timeout);

    let notifier = Arc::new(BroadcastNotifier::default());
    let queue = Arc::new(TaskQueue::in_memory().with_notifier(notifier.clone()));
    let events = spawn_event_log(Arc::clone(&queue), notifier.subscribe());

    let registry = HandlerRegistry::uniform(Arc::new(SimulatedHandler::new(simulation)));
    let runtime = Arc::new(Runtime::new(Arc::new(registry)));

    match cli.command {
        Command::Run { tasks } => {
            for new in demo_tasks(tasks) {
                queue.create(new).await?;
            }
            info!(tasks, "submitted demo tasks");

            let pool = WorkerPool::spawn(&worker_config, Arc::clone(&queue), runtime)?;
            let outcome = wait_for(timeout, wait_settled(&queue)).await;
            pool.shutdown_and_join().await;
            events.abort();

            let stats = match outcome {
                Some(stats) => stats?,
                None => queue.stats().await?,
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Submit {
            name,
            kind,
            priority,
            payload,
        } => {
            let payload: Payload =
                serde_json::from_str(&payload).context("--payload must be a JSON object")?;
            let task = queue
                .create(
                    NewTask::new(name, kind)
                        .with_payload(payload)
                        .with_priority(priority),
                )
                .await?;
            info!(task_id = %task.id, "task submitted");

            let pool = WorkerPool::spawn(&worker_config, Arc::clone(&queue), runtime)?;
            let outcome = wait_for(timeout, wait_terminal(&queue, task.id)).await;
            pool.shutdown_and_join().await;
            events.abort();

            let task = match outcome {
                Some(task) => task?,
                None => match queue.get(task.id).await? {
                    Some(task) => task,
                    None => bail!("task {} disappeared", task.id),
                },
            };
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
    }

    Ok(())
}

/// Race `fut` against the timeout and Ctrl-C. `None` when either wins.
async fn wait_for<T>(timeout: Duration, fut: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        out = fut => Some(out),
        _ = tokio::time::sleep(timeout) => {
            warn!(timeout_secs = timeout.as_secs(), "timed out waiting for tasks");
            None
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            None
        }
    }
}

async fn wait_settled(queue: &TaskQueue) -> anyhow::Result<TaskStats> {
    loop {
        let stats = queue.stats().await?;
        if stats.is_settled() {
            return Ok(stats);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

async fn wait_terminal(queue: &TaskQueue, id: TaskId) -> anyhow::Result<Task> {
    loop {
        let Some(task) = queue.get(id).await? else {
            bail!("task {id} not found");
        };
        if task.status.is_terminal() {
            return Ok(task);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

fn spawn_event_log(
    queue: Arc<TaskQueue>,
    mut rx: broadcast::Receiver<QueueEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(QueueEvent::TaskChanged(id)) => match queue.get(id).await {
                    Ok(Some(task)) => info!(
                        task_id = %id,
                        status = %task.status,
                        progress = task.progress,
                        retries = task.retry_count,
                        "task changed"
                    ),
                    Ok(None) => debug!(task_id = %id, "changed task has no record"),
                    Err(e) => warn!(task_id = %id, error = %e, "failed to read changed task"),
                },
                Ok(QueueEvent::StatsChanged) => {
                    if let Ok(stats) = queue.stats().await {
                        debug!(
                            pending = stats.pending,
                            processing = stats.processing,
                            retrying = stats.retrying,
                            completed = stats.completed,
                            failed = stats.failed,
                            "stats changed"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "event log lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn demo_tasks(n: usize) -> Vec<NewTask> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|i| {
            let kind = *TaskKind::ALL.choose(&mut rng).unwrap_or(&TaskKind::Email);
            NewTask::new(format!("{kind}-{i}"), kind)
                .with_payload(demo_payload(kind, &mut rng))
                .with_priority(rng.gen_range(1..=10))
        })
        .collect()
}

fn demo_payload(kind: TaskKind, rng: &mut impl Rng) -> Payload {
    let mut payload = Payload::new();
    let (key, value): (&str, serde_json::Value) = match kind {
        TaskKind::Email => ("recipient", format!("user{}@example.com", rng.gen_range(1..100)).into()),
        TaskKind::DataProcessing => ("data_size", rng.gen_range(1_000u64..100_000).into()),
        TaskKind::FileConversion => ("filename", format!("document-{}.pdf", rng.gen_range(1..100)).into()),
        TaskKind::ApiCall => ("endpoint", "https://api.example.com/v1/sync".into()),
        TaskKind::ReportGeneration => ("report_type", "monthly".into()),
    };
    payload.insert(key.to_string(), value);
    payload
}
