//! The [`Container`] trait -- the storage/queue interface for tasks.
//!
//! Each concrete backend (in-memory queue, relational store, a combination
//! of both) implements this trait. The trait is intentionally object-safe
//! (associated types, no generic methods) so it can be stored as
//! `Arc<dyn Container<...>>` by a generic [`crate::scheduler::Scheduler`]
//! the same way `gator-core`'s `Harness` is stored as `Box<dyn Harness>`.

use async_trait::async_trait;

use crate::error::ContainerError;
use crate::task::{AsyncTaskStatus, Task};

/// Durable/volatile storage of tasks and their state transitions.
///
/// All `To*Status` operations are CAS-conditional on the task's prior
/// status matching what the caller observed: if the task has already
/// transitioned (by another loop, or a peer scheduler instance against a
/// shared durable store), the call fails with [`ContainerError::StaleStatus`]
/// and the caller must abandon the attempted action rather than retry
/// blindly (spec.md §7).
#[async_trait]
pub trait Container: Send + Sync {
    type Payload: Send + Sync + Clone + 'static;
    type Output: Send + Sync + 'static;

    /// Insert a new task. The caller sets `id` and `payload`; the container
    /// assigns `Waiting`. Fails with [`ContainerError::DuplicateId`] if the
    /// id is already present.
    async fn add_task(
        &self,
        task: Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError>;

    /// Return up to `limit` waiting tasks, ordered by the container's own
    /// policy (priority ascending, then enqueue time). May return fewer,
    /// including zero. Must not return the same task twice to concurrent
    /// callers within the same scheduler.
    async fn get_waiting_task(
        &self,
        limit: usize,
    ) -> Result<Vec<Task<Self::Payload>>, ContainerError>;

    /// Return every task currently `Running`.
    async fn get_running_task(&self) -> Result<Vec<Task<Self::Payload>>, ContainerError>;

    /// Cheap count of `Running` tasks; consulted every dispatch cycle.
    async fn get_running_task_count(&self) -> Result<usize, ContainerError>;

    async fn to_running_status(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError>;

    /// Return a `Running` task to `Waiting` for another dispatch attempt,
    /// incrementing `attempts`. Used on recoverable failure or timeout
    /// while retries remain (spec.md §3.3).
    async fn retry_task(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError>;

    async fn to_stop_status(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError>;

    async fn to_delete_status(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError>;

    async fn to_failed_status(
        &self,
        task: &Task<Self::Payload>,
        reason: String,
    ) -> Result<Task<Self::Payload>, ContainerError>;

    async fn to_export_status(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError>;

    async fn to_success_status(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError>;

    /// Update progress/heartbeat fields without changing high-level status.
    async fn update_running_task_status(
        &self,
        task: &Task<Self::Payload>,
        status: &AsyncTaskStatus,
    ) -> Result<(), ContainerError>;

    /// Persist the opaque output artifact (used by combined containers that
    /// don't delegate to a separate [`crate::persistencer::Persistencer`]).
    async fn save_data(
        &self,
        task: &Task<Self::Payload>,
        output: Self::Output,
    ) -> Result<(), ContainerError>;
}

/// Extension capability used only by [`crate::composite::CompositeContainer`]
/// during construction to rehydrate a volatile layer from a durable one.
///
/// `spec.md` is silent on how a `Container` exposes insertion at a status
/// other than `Waiting`; rather than widen [`Container::add_task`]'s
/// contract this is kept as a separate, narrowly-scoped trait that
/// concrete backends may additionally implement.
#[async_trait]
pub trait RehydrationSink: Container {
    /// Insert a task preserving its current status (e.g. a `Running` task
    /// recovered from a durable store at startup). Never called by
    /// [`crate::scheduler::Scheduler`] itself.
    async fn seed_task(&self, task: Task<Self::Payload>) -> Result<(), ContainerError>;
}
