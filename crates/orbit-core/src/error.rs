//! Error taxonomy for the scheduler's collaborator traits.
//!
//! Trait-boundary errors are `thiserror` enums callers can match on;
//! internal engine code propagates them with `anyhow::Context` the way
//! the rest of the engine does (teacher pattern: `gator-core`'s
//! `token`/`state` modules).

use crate::task::TaskStatus;

/// Errors a [`crate::container::Container`] may return.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("task id {0:?} already exists")]
    DuplicateId(String),

    #[error("task {task_id:?} has status {actual}, expected {expected}")]
    StaleStatus {
        task_id: String,
        expected: TaskStatus,
        actual: TaskStatus,
    },

    #[error("task {0:?} not found")]
    NotFound(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Errors a [`crate::actuator::Actuator`] may return.
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("actuator init failed: {0}")]
    Init(#[source] anyhow::Error),

    #[error("actuator start failed: {0}")]
    Start(#[source] anyhow::Error),

    #[error("actuator status query failed: {0}")]
    Query(#[source] anyhow::Error),

    #[error("actuator output retrieval failed: {0}")]
    Output(#[source] anyhow::Error),

    #[error("actuator stop failed: {0}")]
    Stop(#[source] anyhow::Error),
}

/// Errors a [`crate::persistencer::Persistencer`] may return.
#[derive(Debug, thiserror::Error)]
pub enum PersistencerError {
    #[error("failed to persist task output: {0}")]
    Persist(#[source] anyhow::Error),

    #[error("failed to retrieve persisted task output: {0}")]
    Retrieve(#[source] anyhow::Error),

    #[error("failed to delete persisted task output: {0}")]
    Delete(#[source] anyhow::Error),
}

/// Errors from [`crate::scheduler::Scheduler::add_task`], which runs the
/// task through the actuator's `init` before handing it to the container.
#[derive(Debug, thiserror::Error)]
pub enum AddTaskError {
    #[error(transparent)]
    Actuator(#[from] ActuatorError),
    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Construction-time validation failures for [`crate::scheduler::SchedulerConfig`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchedulerConfigError {
    #[error(
        "no status source configured: DisableStatePoll is set and EnableStateCallback is not"
    )]
    NoStatusSource,

    #[error("EnableStateCallback is set but no CallbackReceiver was provided")]
    MissingCallbackReceiver,

    #[error("TaskLimit must be greater than zero")]
    ZeroTaskLimit,
}
