//! The [`Actuator`] trait -- pluggable execution backend.
//!
//! Mirrors [`crate::container::Container`]'s object-safety approach: an
//! associated `Payload`/`Output` pair instead of generic methods, following
//! `gator-core`'s `Harness` trait.

use async_trait::async_trait;

use crate::error::ActuatorError;
use crate::task::{AsyncTaskStatus, Task};

/// Outcome of [`Actuator::start`].
///
/// Replaces the `(Task, ignoreErr bool, err error)` triple return of the
/// original scheduler with an enum in the style of `gator-core`'s
/// `LifecycleResult`: a task can start cleanly, be rejected in a way the
/// dispatch loop should treat as a no-op (task stays `Waiting`, no retry
/// consumed), or fail outright (counts as an attempt).
#[derive(Debug)]
pub enum StartOutcome<P> {
    /// The task was accepted and is now executing.
    Started(Task<P>),
    /// The actuator declined to start the task right now; the dispatch
    /// loop leaves it `Waiting` for the next cycle instead of failing it.
    Ignored { task: Task<P>, err: ActuatorError },
    /// The actuator attempted and failed to start the task; terminal --
    /// there is no running-task record yet for it to retry against.
    Failed(ActuatorError),
}

/// Drives execution of a task's payload. Implementations own whatever
/// out-of-process or async work the payload represents (a subprocess, an
/// HTTP call to a worker fleet, a long-running job submitted to another
/// system).
#[async_trait]
pub trait Actuator: Send + Sync {
    type Payload: Send + Sync + Clone + 'static;
    type Output: Send + Sync + 'static;

    /// Pre-dispatch validation/enrichment, called by
    /// [`crate::scheduler::Scheduler::add_task`] before the task ever
    /// reaches the `Container`. Rejecting here means the task is never
    /// added at all.
    async fn init(&self, task: Task<Self::Payload>) -> Result<Task<Self::Payload>, ActuatorError>;

    /// Begin executing `task`. Called by the dispatch loop once per task,
    /// under the scheduler's `task_limit` concurrency bound. Must not
    /// block until completion: if execution is inherently synchronous,
    /// spawn a worker and report progress through
    /// [`Actuator::get_async_task_status`] instead.
    async fn start(&self, task: Task<Self::Payload>) -> StartOutcome<Self::Payload>;

    /// Batch status query over every currently `Running` task, used by
    /// the status-poll loop. The returned vector must have exactly one
    /// entry per input task, in the same order.
    async fn get_async_task_status(
        &self,
        tasks: &[Task<Self::Payload>],
    ) -> Result<Vec<AsyncTaskStatus>, ActuatorError>;

    /// Retrieve the task's output once it has finished successfully.
    /// Called at most once per task, before the `Exporting` transition.
    async fn get_output(&self, task: &Task<Self::Payload>) -> Result<Self::Output, ActuatorError>;

    /// Best-effort request to stop a running task (e.g. on `StopTask` or
    /// when the dispatch loop discovers the container is over its running
    /// limit). Implementations that cannot cancel in-flight work may no-op.
    /// Idempotent.
    async fn stop(&self, task: &Task<Self::Payload>) -> Result<(), ActuatorError>;
}
