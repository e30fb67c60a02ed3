//! [`CompositeContainer`] -- pairs a durable [`Container`] with a fast
//! volatile one, writing through to durable storage first (except for
//! `add_task`) and rehydrating the volatile layer from durable state at
//! construction time.
//!
//! Grounded directly on `container/combination_container.go`: durable-first
//! writes, `add_task` is volatile-first with a rollback-to-`Deleted` on
//! durable failure, and rehydration pulls running tasks before paginating
//! through waiting tasks in batches of 1000.

use async_trait::async_trait;
use tracing::error;

use crate::container::{Container, RehydrationSink};
use crate::error::ContainerError;
use crate::task::{AsyncTaskStatus, Task};

const REHYDRATION_BATCH_SIZE: usize = 1000;

/// `D` is the durable backend (source of truth); `V` is the volatile,
/// fast-path backend the scheduler's hot loops actually read from.
pub struct CompositeContainer<D, V> {
    durable: D,
    volatile: V,
}

impl<D, V> CompositeContainer<D, V>
where
    D: Container,
    V: Container<Payload = D::Payload, Output = D::Output> + RehydrationSink,
{
    /// Construct a composite container, rehydrating `volatile` from
    /// `durable`'s current state: all running tasks first, then waiting
    /// tasks paginated in batches of [`REHYDRATION_BATCH_SIZE`].
    pub async fn new(durable: D, volatile: V) -> Result<Self, ContainerError> {
        for task in durable.get_running_task().await? {
            volatile.seed_task(task).await?;
        }

        loop {
            let batch = durable.get_waiting_task(REHYDRATION_BATCH_SIZE).await?;
            let got = batch.len();
            for task in batch {
                volatile.seed_task(task).await?;
            }
            if got < REHYDRATION_BATCH_SIZE {
                break;
            }
        }

        Ok(Self { durable, volatile })
    }
}

#[async_trait]
impl<D, V> Container for CompositeContainer<D, V>
where
    D: Container,
    V: Container<Payload = D::Payload, Output = D::Output> + RehydrationSink,
{
    type Payload = D::Payload;
    type Output = D::Output;

    /// Volatile-first: the dispatch loop needs the task visible
    /// immediately. If the durable write then fails, the volatile copy is
    /// rolled back to `Deleted` rather than left inconsistent with the
    /// source of truth.
    async fn add_task(
        &self,
        task: Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError> {
        let seeded = self.volatile.add_task(task.clone()).await?;
        match self.durable.add_task(task).await {
            Ok(durable_task) => Ok(durable_task),
            Err(err) => {
                if let Err(rollback_err) = self.volatile.to_delete_status(&seeded).await {
                    error!(
                        task_id = %seeded.id,
                        error = %rollback_err,
                        "failed to roll back volatile task after durable add_task failure"
                    );
                }
                Err(err)
            }
        }
    }

    async fn get_waiting_task(
        &self,
        limit: usize,
    ) -> Result<Vec<Task<Self::Payload>>, ContainerError> {
        self.volatile.get_waiting_task(limit).await
    }

    async fn get_running_task(&self) -> Result<Vec<Task<Self::Payload>>, ContainerError> {
        self.volatile.get_running_task().await
    }

    async fn get_running_task_count(&self) -> Result<usize, ContainerError> {
        self.volatile.get_running_task_count().await
    }

    async fn to_running_status(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError> {
        self.durable.to_running_status(task).await?;
        self.volatile.to_running_status(task).await
    }

    async fn retry_task(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError> {
        self.durable.retry_task(task).await?;
        self.volatile.retry_task(task).await
    }

    async fn to_stop_status(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError> {
        self.durable.to_stop_status(task).await?;
        self.volatile.to_stop_status(task).await
    }

    async fn to_delete_status(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError> {
        self.durable.to_delete_status(task).await?;
        self.volatile.to_delete_status(task).await
    }

    async fn to_failed_status(
        &self,
        task: &Task<Self::Payload>,
        reason: String,
    ) -> Result<Task<Self::Payload>, ContainerError> {
        self.durable.to_failed_status(task, reason.clone()).await?;
        self.volatile.to_failed_status(task, reason).await
    }

    async fn to_export_status(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError> {
        self.durable.to_export_status(task).await?;
        self.volatile.to_export_status(task).await
    }

    async fn to_success_status(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Task<Self::Payload>, ContainerError> {
        self.durable.to_success_status(task).await?;
        self.volatile.to_success_status(task).await
    }

    async fn update_running_task_status(
        &self,
        task: &Task<Self::Payload>,
        status: &AsyncTaskStatus,
    ) -> Result<(), ContainerError> {
        self.durable.update_running_task_status(task, status).await?;
        self.volatile.update_running_task_status(task, status).await
    }

    async fn save_data(
        &self,
        task: &Task<Self::Payload>,
        output: Self::Output,
    ) -> Result<(), ContainerError> {
        self.durable.save_data(task, output).await
    }
}
