//! Priority-ordered in-memory [`Container`]: lower `priority` value first,
//! ties broken by enqueue order.

use async_trait::async_trait;
use orbit_core::container::{Container, RehydrationSink};
use orbit_core::error::ContainerError;
use orbit_core::task::{AsyncTaskStatus, Task};

use crate::store::Store;

pub struct PriorityContainer<P, O> {
    store: Store<P, O>,
}

impl<P: Clone + Send + Sync + 'static, O: Send + Sync + 'static> PriorityContainer<P, O> {
    pub fn new() -> Self {
        Self {
            store: Store::new(),
        }
    }
}

impl<P: Clone + Send + Sync + 'static, O: Send + Sync + 'static> Default
    for PriorityContainer<P, O>
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: Clone + Send + Sync + 'static, O: Send + Sync + 'static> Container
    for PriorityContainer<P, O>
{
    type Payload = P;
    type Output = O;

    async fn add_task(&self, task: Task<P>) -> Result<Task<P>, ContainerError> {
        self.store.add_task(task).await
    }

    async fn get_waiting_task(&self, limit: usize) -> Result<Vec<Task<P>>, ContainerError> {
        let mut waiting = self.store.waiting().await;
        waiting.sort_by_key(|(task, seq)| (task.priority, *seq));
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
    for PriorityContainer<P, O>
{
    async fn seed_task(&self, task: Task<P>) -> Result<(), ContainerError> {
        self.store.seed_task(task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lower_priority_value_dispatches_first() {
        let container: PriorityContainer<&str, ()> = PriorityContainer::new();
        container.add_task(Task::new("low", 10, "x")).await.unwrap();
        container.add_task(Task::new("high", 1, "x")).await.unwrap();
        let waiting = container.get_waiting_task(10).await.unwrap();
        assert_eq!(waiting[0].id, "high");
        assert_eq!(waiting[1].id, "low");
    }

    #[tokio::test]
    async fn equal_priority_breaks_tie_by_enqueue_order() {
        let container: PriorityContainer<&str, ()> = PriorityContainer::new();
        container.add_task(Task::new("a", 5, "x")).await.unwrap();
        container.add_task(Task::new("b", 5, "x")).await.unwrap();
        let waiting = container.get_waiting_task(10).await.unwrap();
        assert_eq!(waiting[0].id, "a");
        assert_eq!(waiting[1].id, "b");
    }
}
