//! Dispatch loop: starts waiting tasks under the concurrency bound.
//!
//! Ports `task_scheduler.go`'s `schedulerTask`/`scheduleOnce`: each cycle
//! re-checks the running-task count (another scheduler instance sharing a
//! durable container may have started tasks concurrently), acquires a
//! permit per task it starts, and re-checks the running count again after
//! `Actuator::Start` returns before committing `ToRunningStatus`. Timeout
//! enforcement lives in `poll.rs`, not here -- see spec.md §5.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::actuator::StartOutcome;
use crate::task::TaskStatus;

use super::Scheduler;

impl<P, O> Scheduler<P, O>
where
    P: Send + Sync + Clone + 'static,
    O: Send + Sync + 'static,
{
    pub(super) async fn dispatch_loop(self: Arc<Self>) {
        if self.config.scan_interval.is_zero() {
            loop {
                if self.cancel.is_cancelled() {
                    debug!("dispatch loop stopping");
                    return;
                }
                self.dispatch_once().await;
                tokio::task::yield_now().await;
            }
        }

        let mut ticker = tokio::time::interval(self.config.scan_interval);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("dispatch loop stopping");
                    return;
                }
                _ = ticker.tick() => self.dispatch_once().await,
            }
        }
    }

    #[instrument(skip(self))]
    async fn dispatch_once(self: &Arc<Self>) {
        let running = match self.container.get_running_task_count().await {
            Ok(n) => n,
            Err(err) => {
                warn!(error = %err, "failed to read running task count");
                return;
            }
        };
        if running >= self.config.task_limit {
            return;
        }

        let available = self.config.task_limit - running;
        let waiting = match self.container.get_waiting_task(available).await {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(error = %err, "failed to fetch waiting tasks");
                return;
            }
        };

        for task in waiting {
            let Ok(permit) = self.semaphore.clone().try_acquire_owned() else {
                break;
            };

            let this = Arc::clone(self);
            tokio::spawn(async move {
                let _permit = permit;
                this.start_one(task).await;
            });
        }
    }

    /// Hand `task` to the actuator first, while it is still `Waiting`, and
    /// only persist `Running` once the actuator confirms it accepted the
    /// task. Before that, re-read `running_count`: if a peer scheduler
    /// instance against the same durable container started enough tasks
    /// in the meantime to reach `task_limit`, abandon this dispatch rather
    /// than push the fleet over the limit (spec.md §4.E.1). If the
    /// container transition then loses a race anyway, the actuator is
    /// told to stop what it just started. Ports `scheduleOnce`'s
    /// post-`Start` re-check of `ToRunningStatus`.
    async fn start_one(self: Arc<Self>, task: crate::task::Task<P>) {
        let task_id = task.id.clone();
        match self.actuator.start(task).await {
            StartOutcome::Started(task) => {
                match self.container.get_running_task_count().await {
                    Ok(running) if running >= self.config.task_limit => {
                        debug!(
                            task_id = %task_id,
                            running,
                            task_limit = self.config.task_limit,
                            "running count reached task_limit after start, abandoning dispatch"
                        );
                        let _ = self.actuator.stop(&task).await;
                        return;
                    }
                    Err(err) => {
                        warn!(task_id = %task_id, error = %err, "failed to re-check running count after start");
                        let _ = self.actuator.stop(&task).await;
                        return;
                    }
                    Ok(_) => {}
                }

                match self.container.to_running_status(&task).await {
                    Ok(_) => debug!(task_id = %task_id, "task started"),
                    Err(err) => {
                        // Another scheduler instance against the same durable
                        // container committed first; this instance's actuator
                        // invocation is the loser and must not keep running.
                        // Multi-instance consensus beyond this stop is out of
                        // scope (no distributed lock on which instance "owns"
                        // the resulting Failed transition).
                        debug!(task_id = %task_id, error = %err, "lost race to start task, stopping");
                        let _ = self.actuator.stop(&task).await;
                    }
                }
            }
            StartOutcome::Ignored { task, err } => {
                debug!(task_id = %task.id, error = %err, "actuator deferred task start, leaving it waiting");
            }
            StartOutcome::Failed(err) => {
                warn!(task_id = %task_id, error = %err, "actuator failed to start task");
                self.record_start_failure(&task_id, err.to_string()).await;
            }
        }
    }

    /// A task failed before the container ever recorded it as `Running`
    /// (the actuator rejected the start attempt itself, e.g. a malformed
    /// payload it cannot execute at all). There is no running-task record
    /// to retry against, so this is terminal immediately rather than
    /// consuming one of `max_failed_attempts`'s attempts.
    async fn record_start_failure(&self, task_id: &str, reason: String) {
        let Ok(waiting) = self.container.get_waiting_task(usize::MAX).await else {
            return;
        };
        let Some(task) = waiting.into_iter().find(|t| t.id == task_id) else {
            return;
        };
        match self.container.to_failed_status(&task, reason).await {
            Ok(task) => self.finish(task).await,
            Err(err) => warn!(task_id = %task_id, error = %err, "failed to mark task as failed"),
        }
    }

    /// Apply a failure: retry (back to `Waiting`) if attempts remain,
    /// otherwise terminally `Failed`. Ports `task_scheduler.go`'s
    /// `failed()`.
    pub(super) async fn record_failure(&self, task_id: &str, reason: String) {
        let Ok(running) = self.container.get_running_task().await else {
            return;
        };
        let Some(task) = running.into_iter().find(|t| t.id == task_id) else {
            return;
        };

        if task.status != TaskStatus::Running {
            return;
        }

        if task.attempts < self.config.max_failed_attempts {
            if let Err(err) = self.container.retry_task(&task).await {
                warn!(task_id = %task_id, error = %err, "failed to requeue task for retry");
            }
            return;
        }

        match self.container.to_failed_status(&task, reason.clone()).await {
            Ok(task) => self.finish(task).await,
            Err(err) => warn!(task_id = %task_id, error = %err, "failed to mark task as failed"),
        }
    }

    /// Push a terminal task into the finished-task queue, when enabled.
    pub(super) async fn finish(&self, task: crate::task::Task<P>) {
        if let Some(queue) = &self.finished {
            queue.offer(task).await;
        }
    }
}
