//! The [`Persistencer`] trait -- optional durable storage for task output.
//!
//! When configured on [`crate::scheduler::SchedulerConfig`], a task that
//! finishes successfully transitions `Running -> Exporting -> Success`,
//! with the `Exporting` phase calling [`Persistencer::persist`] before the
//! final transition. No teacher analogue exists for this specific trait;
//! its shape is modeled on `Container`/`Actuator`'s object-safe pattern.

use async_trait::async_trait;

use crate::error::PersistencerError;
use crate::task::Task;

#[async_trait]
pub trait Persistencer: Send + Sync {
    type Payload: Send + Sync + Clone + 'static;
    type Output: Send + Sync + 'static;

    /// Durably store `output` for `task`. Must be safe to call more than
    /// once for the same task id (the scheduler may retry on timeout).
    async fn persist(
        &self,
        task: &Task<Self::Payload>,
        output: Self::Output,
    ) -> Result<(), PersistencerError>;

    /// Retrieve previously persisted output, if any exists.
    async fn retrieve(
        &self,
        task: &Task<Self::Payload>,
    ) -> Result<Option<Self::Output>, PersistencerError>;

    /// Remove persisted output, used when a task is deleted.
    async fn delete(&self, task: &Task<Self::Payload>) -> Result<(), PersistencerError>;
}
