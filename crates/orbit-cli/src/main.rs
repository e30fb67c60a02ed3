//! Thin demo binary: submits tasks against an in-memory `Container` and a
//! tiny function-based `Actuator`, then prints lifecycle transitions as
//! they happen. Mirrors `gator-cli/src/main.rs`'s tracing-subscriber
//! bootstrap and `clap` subcommand shape; concrete backends and a real
//! front-end are out of scope for `orbit-core` itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use orbit_core::actuator::{Actuator, StartOutcome};
use orbit_core::error::ActuatorError;
use orbit_core::task::{AsyncTaskStatus, Task};
use orbit_core::{Scheduler, SchedulerConfig};
use orbit_memory::FifoContainer;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orbit", about = "Demo driver for orbit-core's scheduler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a handful of sleep-and-echo demo tasks and watch them run.
    Demo {
        #[arg(long, default_value_t = 5)]
        tasks: u32,
        #[arg(long, default_value_t = 2)]
        concurrency: usize,
    },
}

/// Executes each task by sleeping for `payload` milliseconds, then
/// succeeding. Exists only to give the demo something to schedule.
struct SleepActuator;

#[async_trait]
impl Actuator for SleepActuator {
    type Payload = u64;
    type Output = String;

    async fn init(&self, task: Task<u64>) -> Result<Task<u64>, ActuatorError> {
        Ok(task)
    }

    async fn start(&self, task: Task<u64>) -> StartOutcome<u64> {
        let millis = task.payload;
        let id = task.id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            tracing::debug!(task_id = %id, "demo task finished sleeping");
        });
        StartOutcome::Started(task)
    }

    async fn get_async_task_status(
        &self,
        tasks: &[Task<u64>],
    ) -> Result<Vec<AsyncTaskStatus>, ActuatorError> {
        let now = chrono::Utc::now();
        Ok(tasks
            .iter()
            .map(|task| {
                let elapsed = task
                    .start_time
                    .map(|start| now.signed_duration_since(start))
                    .unwrap_or_default();
                if elapsed.num_milliseconds() as u64 >= task.payload {
                    AsyncTaskStatus::Success
                } else {
                    AsyncTaskStatus::Running {
                        progress: serde_json::Value::Null,
                    }
                }
            })
            .collect())
    }

    async fn get_output(&self, task: &Task<u64>) -> Result<String, ActuatorError> {
        Ok(format!("slept {}ms", task.payload))
    }

    async fn stop(&self, _task: &Task<u64>) -> Result<(), ActuatorError> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Demo { tasks, concurrency } => run_demo(tasks, concurrency).await,
    }
}

async fn run_demo(tasks: u32, concurrency: usize) -> anyhow::Result<()> {
    let container = Arc::new(FifoContainer::<u64, String>::new());
    let actuator = Arc::new(SleepActuator);

    let config = SchedulerConfig {
        task_limit: concurrency,
        ..SchedulerConfig::default()
    };
    let scheduler = Arc::new(Scheduler::new(config, container, actuator, None)?);
    scheduler.start().await;

    for i in 0..tasks {
        let millis = 100 + (i as u64 * 50);
        scheduler
            .add_task(Task::new(format!("demo-{i}"), 0, millis))
            .await?;
    }

    for _ in 0..tasks {
        if let Some(task) = scheduler.finished_tasks().await {
            println!("task {} finished as {:?}", task.id, task.status);
        }
    }

    scheduler.close().await;
    Ok(())
}
