//! Status-poll loop: periodically asks the actuator for the current state
//! of every running task. Ports `task_scheduler.go`'s `updateTaskStatus`/
//! `updateOnce`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::task::{AsyncTaskStatus, Task};

use super::Scheduler;

impl<P, O> Scheduler<P, O>
where
    P: Send + Sync + Clone + 'static,
    O: Send + Sync + 'static,
{
    pub(super) async fn poll_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("poll loop stopping");
                    return;
                }
                _ = ticker.tick() => self.poll_once().await,
            }
        }
    }

    /// Fetch every `Running` task and its actuator-reported status in one
    /// batch, then process each `(task, status)` pair concurrently, bounded
    /// by the shared per-cycle semaphore (spec.md §4.E.2, §5). This is also
    /// the only place `task_timeout` is enforced: per spec.md §5,
    /// "callback-only mode cannot enforce timeouts" -- the dispatch loop
    /// and callback loop never call into timeout logic.
    #[instrument(skip(self))]
    async fn poll_once(self: &Arc<Self>) {
        let running = match self.container.get_running_task().await {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(error = %err, "failed to fetch running tasks for poll");
                return;
            }
        };

        if running.is_empty() {
            return;
        }

        let statuses = match self.actuator.get_async_task_status(&running).await {
            Ok(statuses) if statuses.len() == running.len() => statuses,
            Ok(statuses) => {
                warn!(
                    expected = running.len(),
                    got = statuses.len(),
                    "actuator returned mismatched status count, skipping this poll tick"
                );
                return;
            }
            Err(err) => {
                debug!(error = %err, "batch status query failed, will retry next cycle");
                return;
            }
        };

        for (task, status) in running.into_iter().zip(statuses) {
            let Ok(permit) = self.semaphore.clone().try_acquire_owned() else {
                // No permits free this cycle; remaining pairs wait for the
                // next tick rather than blocking here.
                break;
            };
            let this = Arc::clone(self);
            tokio::spawn(async move {
                let _permit = permit;
                this.process_status(task, status).await;
            });
        }
    }

    /// Handle one `(task, status)` pair from the poll loop: a timed-out
    /// `Running` task is failed directly (spec.md §4.E.2), otherwise the
    /// status is applied through the same path the callback loop uses.
    async fn process_status(&self, task: Task<P>, status: AsyncTaskStatus) {
        if let AsyncTaskStatus::Running { .. } = &status {
            if let Some(timeout) = self.config.task_timeout {
                let timed_out = task
                    .start_time
                    .map(|start| {
                        Utc::now()
                            .signed_duration_since(start)
                            .to_std()
                            .map(|elapsed| elapsed > timeout)
                            .unwrap_or(true)
                    })
                    .unwrap_or(false);
                if timed_out {
                    self.fail_task(&task, "task exceeded task_timeout".to_owned())
                        .await;
                    let _ = self.actuator.stop(&task).await;
                    return;
                }
            }
        }
        self.apply_status(&task.id, status).await;
    }

    /// Apply a reported status change, suppressing duplicates against
    /// whatever the callback loop may have already applied for the same
    /// task id (spec.md §4.F).
    pub(super) async fn apply_status(&self, task_id: &str, status: AsyncTaskStatus) {
        match status {
            AsyncTaskStatus::Running { .. } => {
                let Ok(running) = self.container.get_running_task().await else {
                    return;
                };
                if let Some(task) = running.into_iter().find(|t| t.id == task_id) {
                    if let Err(err) = self
                        .container
                        .update_running_task_status(&task, &status)
                        .await
                    {
                        debug!(task_id, error = %err, "failed to record progress update");
                    }
                }
            }
            AsyncTaskStatus::Success => {
                if !self.suppression.record(task_id).await {
                    return;
                }
                self.complete_success(task_id).await;
            }
            AsyncTaskStatus::Failed { reason } => {
                if !self.suppression.record(task_id).await {
                    return;
                }
                self.record_failure(task_id, reason).await;
            }
        }
    }

    /// A task reported success: enter the export pipeline if a
    /// `Persistencer` is configured, otherwise mark `Success` directly.
    /// Ports `task_scheduler.go`'s `success()`; order matches spec.md
    /// §4.E's export pipeline exactly: `ToExportStatus` strictly precedes
    /// `GetOutput`, which precedes `DataPersistence`, which precedes
    /// `ToSuccessStatus`.
    async fn complete_success(&self, task_id: &str) {
        let Ok(running) = self.container.get_running_task().await else {
            return;
        };
        let Some(task) = running.into_iter().find(|t| t.id == task_id) else {
            return;
        };

        let Some(persistencer) = &self.persistencer else {
            match self.container.to_success_status(&task).await {
                Ok(task) => self.finish(task).await,
                Err(err) => warn!(task_id, error = %err, "failed to mark task successful"),
            }
            return;
        };

        let task = match self.container.to_export_status(&task).await {
            Ok(task) => task,
            Err(err) => {
                warn!(task_id, error = %err, "failed to enter exporting status");
                self.fail_task(&task, err.to_string()).await;
                return;
            }
        };

        let output = match self.actuator.get_output(&task).await {
            Ok(output) => output,
            Err(err) => {
                warn!(task_id, error = %err, "failed to retrieve task output after success");
                self.fail_task(&task, err.to_string()).await;
                return;
            }
        };

        if let Err(err) = persistencer.persist(&task, output).await {
            warn!(task_id, error = %err, "failed to persist task output");
            self.fail_task(&task, err.to_string()).await;
            return;
        }

        match self.container.to_success_status(&task).await {
            Ok(task) => self.finish(task).await,
            Err(err) => {
                warn!(
                    task_id,
                    error = %err,
                    "failed to mark task successful after persisting output, compensating"
                );
                if let Err(del_err) = persistencer.delete(&task).await {
                    warn!(task_id, error = %del_err, "compensating delete of persisted output also failed");
                }
                self.fail_task(&task, err.to_string()).await;
            }
        }
    }

    /// Unconditionally transition `task` to `Failed`, regardless of its
    /// current status (used by the export pipeline, where a task may be
    /// `Exporting` rather than `Running` when a step fails -- unlike
    /// `record_failure`, this never consults the retry budget, matching
    /// spec.md §4.E's unconditional "FAIL" for export-pipeline errors).
    pub(super) async fn fail_task(&self, task: &crate::task::Task<P>, reason: String) {
        match self.container.to_failed_status(task, reason).await {
            Ok(task) => self.finish(task).await,
            Err(err) => warn!(task_id = %task.id, error = %err, "failed to mark task as failed"),
        }
    }
}
