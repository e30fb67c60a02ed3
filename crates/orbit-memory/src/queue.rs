//! FIFO-ordered in-memory [`Container`].

use async_trait::async_trait;
use orbit_core::container::{Container, RehydrationSink};
use orbit_core::error::ContainerError;
use orbit_core::task::{AsyncTaskStatus, Task};

use crate::store::Store;

/// Returns waiting tasks in enqueue order, oldest first.
pub struct FifoContainer<P, O> {
    store: Store<P, O>,
}

impl<P: Clone + Send + Sync + 'static, O: Send + Sync + 'static> FifoContainer<P, O> {
    pub fn new() -> Self {
        Self {
            store: Store::new(),
        }
    }
}

impl<P: Clone + Send + Sync + 'static, O: Send + Sync + 'static> Default for FifoContainer<P, O> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: Clone + Send + Sync + 'static, O: Send + Sync + 'static> Container
    for FifoContainer<P, O>
{
    type Payload = P;
    type Output = O;

    async fn add_task(&self, task: Task<P>) -> Result<Task<P>, ContainerError> {
        self.store.add_task(task).await
    }

    async fn get_waiting_task(&self, limit: usize) -> Result<Vec<Task<P>>, ContainerError> {
        let mut waiting = self.store.waiting().await;
        waiting.sort_by_key(|(_, seq)| *seq);
        Ok(waiting
            .into_iter()
            .take(limit)
            .map(|(task, _)| task)
            .collect())
    }

    async fn get_running_task(&self) -> Result<Vec<Task<P>>, ContainerError> {
        Ok(self.store.running().await)
    }

    async fn get_running_task_count(&self) -> Result<usize, ContainerError> {
        Ok(self.store.running_count().await)
    }

    async fn to_running_status(&self, task: &Task<P>) -> Result<Task<P>, ContainerError> {
        self.store.to_running(task).await
    }

    async fn retry_task(&self, task: &Task<P>) -> Result<Task<P>, ContainerError> {
        self.store.retry(task).await
    }

    async fn to_stop_status(&self, task: &Task<P>) -> Result<Task<P>, ContainerError> {
        self.store.to_stop(task).await
    }

    async fn to_delete_status(&self, task: &Task<P>) -> Result<Task<P>, ContainerError> {
        self.store.to_delete(task).await
    }

    async fn to_failed_status(
        &self,
        task: &Task<P>,
        reason: String,
    ) -> Result<Task<P>, ContainerError> {
        self.store.to_failed(task, reason).await
    }

    async fn to_export_status(&self, task: &Task<P>) -> Result<Task<P>, ContainerError> {
        self.store.to_export(task).await
    }

    async fn to_success_status(&self, task: &Task<P>) -> Result<Task<P>, ContainerError> {
        self.store.to_success(task).await
    }

    async fn update_running_task_status(
        &self,
        task: &Task<P>,
        status: &AsyncTaskStatus,
    ) -> Result<(), ContainerError> {
        self.store.update_running_status(task, status).await
    }

    async fn save_data(&self, task: &Task<P>, output: O) -> Result<(), ContainerError> {
        self.store.save_data(task, output).await
    }
}

#[async_trait]
impl<P: Clone + Send + Sync + 'static, O: Send + Sync + 'static> RehydrationSink
    for FifoContainer<P, O>
{
    async fn seed_task(&self, task: Task<P>) -> Result<(), ContainerError> {
        self.store.seed_task(task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waiting_tasks_come_back_in_enqueue_order() {
        let container: FifoContainer<&str, ()> = FifoContainer::new();
        container.add_task(Task::new("a", 0, "x")).await.unwrap();
        container.add_task(Task::new("b", 0, "x")).await.unwrap();
        let waiting = container.get_waiting_task(10).await.unwrap();
        assert_eq!(waiting.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn duplicate_id_rejected() {
        let container: FifoContainer<&str, ()> = FifoContainer::new();
        container.add_task(Task::new("a", 0, "x")).await.unwrap();
        let err = container.add_task(Task::new("a", 0, "x")).await.unwrap_err();
        assert!(matches!(err, ContainerError::DuplicateId(id) if id == "a"));
    }

    #[tokio::test]
    async fn stale_transition_is_rejected() {
        let container: FifoContainer<&str, ()> = FifoContainer::new();
        let task = container.add_task(Task::new("a", 0, "x")).await.unwrap();
        container.to_running_status(&task).await.unwrap();
        let err = container.to_running_status(&task).await.unwrap_err();
        assert!(matches!(err, ContainerError::StaleStatus { .. }));
    }
}
