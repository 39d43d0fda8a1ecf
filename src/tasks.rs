//! One-shot maintenance tasks, run with `restkit task <NAME>`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub struct Task {
    pub name: &'static str,
    pub description: &'static str,
    run: fn() -> TaskFuture,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task '{name}' not found. Available tasks: {available}")]
    Unknown { name: String, available: String },
}

pub const TASKS: &[Task] = &[
    Task {
        name: "cleanup",
        description: "Purge stale records",
        run: cleanup_task,
    },
    Task {
        name: "data-sync",
        description: "Pull data from upstream APIs",
        run: data_sync_task,
    },
    Task {
        name: "send-emails",
        description: "Deliver queued emails",
        run: send_emails_task,
    },
];

pub fn names() -> Vec<&'static str> {
    TASKS.iter().map(|t| t.name).collect()
}

pub fn find(name: &str) -> Option<&'static Task> {
    TASKS.iter().find(|t| t.name == name)
}

/// Run the named task and return how long it took.
pub async fn run(name: &str) -> Result<Duration, TaskError> {
    let task = find(name).ok_or_else(|| TaskError::Unknown {
        name: name.to_owned(),
        available: names().join(", "),
    })?;

    tracing::info!(task = task.name, "running task");
    let started = Instant::now();
    (task.run)().await;
    let elapsed = started.elapsed();

    tracing::info!(task = task.name, ?elapsed, "task completed");
    Ok(elapsed)
}

// ─── Task bodies ─────────────────────────────────────────────────
// Placeholders for real work; each only simulates its duration.

fn cleanup_task() -> TaskFuture {
    Box::pin(cleanup())
}

fn data_sync_task() -> TaskFuture {
    Box::pin(data_sync())
}

fn send_emails_task() -> TaskFuture {
    Box::pin(send_emails())
}

async fn cleanup() {
    tracing::info!("cleaning up old data");
    tokio::time::sleep(Duration::from_secs(1)).await;
}

async fn data_sync() {
    tracing::info!("syncing data from external API");
    tokio::time::sleep(Duration::from_secs(2)).await;
}

async fn send_emails() {
    tracing::info!("sending scheduled emails");
    tokio::time::sleep(Duration::from_millis(1500)).await;
}
