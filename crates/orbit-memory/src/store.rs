//! Shared bookkeeping behind both [`crate::queue::FifoContainer`] and
//! [`crate::priority::PriorityContainer`]: a CAS-guarded in-memory table
//! of tasks plus their saved output, behind a `tokio::sync::RwLock` in the
//! style of `turul-mcp-task-storage`'s `InMemoryTaskStorage`.

use std::collections::HashMap;

use chrono::Utc;
use orbit_core::error::ContainerError;
use orbit_core::task::{AsyncTaskStatus, Task, TaskStatus};
use tokio::sync::RwLock;

struct Entry<P, O> {
    task: Task<P>,
    seq: u64,
    output: Option<O>,
}

pub(crate) struct Store<P, O> {
    tasks: RwLock<HashMap<String, Entry<P, O>>>,
    next_seq: std::sync::atomic::AtomicU64,
}

impl<P: Clone + Send + Sync + 'static, O: Send + Sync + 'static> Store<P, O> {
    pub(crate) fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            next_seq: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub(crate) async fn add_task(
        &self,
        mut task: Task<P>,
    ) -> Result<Task<P>, ContainerError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(ContainerError::DuplicateId(task.id));
        }
        task.status = TaskStatus::Waiting;
        let seq = self
            .next_seq
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        tasks.insert(
            task.id.clone(),
            Entry {
                task: task.clone(),
                seq,
                output: None,
            },
        );
        Ok(task)
    }

    /// Insert preserving whatever status `task` already carries, used by
    /// [`orbit_core::container::RehydrationSink`] implementations.
    pub(crate) async fn seed_task(&self, task: Task<P>) -> Result<(), ContainerError> {
        let mut tasks = self.tasks.write().await;
        let seq = self
            .next_seq
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        tasks.insert(
            task.id.clone(),
            Entry {
                task,
                seq,
                output: None,
            },
        );
        Ok(())
    }

    pub(crate) async fn waiting(&self) -> Vec<(Task<P>, u64)> {
        self.tasks
            .read()
            .await
            .values()
            .filter(|e| e.task.status == TaskStatus::Waiting)
            .map(|e| (e.task.clone(), e.seq))
            .collect()
    }

    pub(crate) async fn running(&self) -> Vec<Task<P>> {
        self.tasks
            .read()
            .await
            .values()
            .filter(|e| e.task.status == TaskStatus::Running)
            .map(|e| e.task.clone())
            .collect()
    }

    pub(crate) async fn running_count(&self) -> usize {
        self.tasks
            .read()
            .await
            .values()
            .filter(|e| e.task.status == TaskStatus::Running)
            .count()
    }

    async fn transition(
        &self,
        task: &Task<P>,
        expected: TaskStatus,
        to: TaskStatus,
        mutate: impl FnOnce(&mut Task<P>),
    ) -> Result<Task<P>, ContainerError> {
        let mut tasks = self.tasks.write().await;
        let entry = tasks
            .get_mut(&task.id)
            .ok_or_else(|| ContainerError::NotFound(task.id.clone()))?;
        if entry.task.status != expected {
            return Err(ContainerError::StaleStatus {
                task_id: task.id.clone(),
                expected,
                actual: entry.task.status,
            });
        }
        entry.task.status = to;
        mutate(&mut entry.task);
        Ok(entry.task.clone())
    }

    pub(crate) async fn to_running(&self, task: &Task<P>) -> Result<Task<P>, ContainerError> {
        self.transition(task, TaskStatus::Waiting, TaskStatus::Running, |t| {
            t.start_time = Some(Utc::now());
        })
        .await
    }

    pub(crate) async fn retry(&self, task: &Task<P>) -> Result<Task<P>, ContainerError> {
        self.transition(task, TaskStatus::Running, TaskStatus::Waiting, |t| {
            t.attempts += 1;
            t.start_time = None;
        })
        .await
    }

    pub(crate) async fn to_stop(&self, task: &Task<P>) -> Result<Task<P>, ContainerError> {
        let mut tasks = self.tasks.write().await;
        let entry = tasks
            .get_mut(&task.id)
            .ok_or_else(|| ContainerError::NotFound(task.id.clone()))?;
        if entry.task.status.is_terminal() {
            return Err(ContainerError::StaleStatus {
                task_id: task.id.clone(),
                expected: TaskStatus::Waiting,
                actual: entry.task.status,
            });
        }
        entry.task.status = TaskStatus::Stopped;
        entry.task.end_time = Some(Utc::now());
        Ok(entry.task.clone())
    }

    pub(crate) async fn to_delete(&self, task: &Task<P>) -> Result<Task<P>, ContainerError> {
        let mut tasks = self.tasks.write().await;
        let entry = tasks
            .get_mut(&task.id)
            .ok_or_else(|| ContainerError::NotFound(task.id.clone()))?;
        if entry.task.status.is_terminal() {
            return Err(ContainerError::StaleStatus {
                task_id: task.id.clone(),
                expected: TaskStatus::Waiting,
                actual: entry.task.status,
            });
        }
        entry.task.status = TaskStatus::Deleted;
        entry.task.end_time = Some(Utc::now());
        Ok(entry.task.clone())
    }

    pub(crate) async fn to_failed(
        &self,
        task: &Task<P>,
        reason: String,
    ) -> Result<Task<P>, ContainerError> {
        let mut tasks = self.tasks.write().await;
        let entry = tasks
            .get_mut(&task.id)
            .ok_or_else(|| ContainerError::NotFound(task.id.clone()))?;
        if entry.task.status.is_terminal() {
            return Err(ContainerError::StaleStatus {
                task_id: task.id.clone(),
                expected: TaskStatus::Running,
                actual: entry.task.status,
            });
        }
        entry.task.status = TaskStatus::Failed;
        entry.task.failed_reason = reason;
        entry.task.end_time = Some(Utc::now());
        Ok(entry.task.clone())
    }

    pub(crate) async fn to_export(&self, task: &Task<P>) -> Result<Task<P>, ContainerError> {
        self.transition(task, TaskStatus::Running, TaskStatus::Exporting, |_| {})
            .await
    }

    pub(crate) async fn to_success(&self, task: &Task<P>) -> Result<Task<P>, ContainerError> {
        let mut tasks = self.tasks.write().await;
        let entry = tasks
            .get_mut(&task.id)
            .ok_or_else(|| ContainerError::NotFound(task.id.clone()))?;
        if entry.task.status != TaskStatus::Running && entry.task.status != TaskStatus::Exporting
        {
            return Err(ContainerError::StaleStatus {
                task_id: task.id.clone(),
                expected: TaskStatus::Running,
                actual: entry.task.status,
            });
        }
        entry.task.status = TaskStatus::Success;
        entry.task.end_time = Some(Utc::now());
        Ok(entry.task.clone())
    }

    pub(crate) async fn update_running_status(
        &self,
        task: &Task<P>,
        status: &AsyncTaskStatus,
    ) -> Result<(), ContainerError> {
        let mut tasks = self.tasks.write().await;
        let entry = tasks
            .get_mut(&task.id)
            .ok_or_else(|| ContainerError::NotFound(task.id.clone()))?;
        if let AsyncTaskStatus::Failed { reason } = status {
            entry.task.failed_reason = reason.clone();
        }
        Ok(())
    }

    pub(crate) async fn save_data(
        &self,
        task: &Task<P>,
        output: O,
    ) -> Result<(), ContainerError> {
        let mut tasks = self.tasks.write().await;
        let entry = tasks
            .get_mut(&task.id)
            .ok_or_else(|| ContainerError::NotFound(task.id.clone()))?;
        entry.output = Some(output);
        Ok(())
    }
}
