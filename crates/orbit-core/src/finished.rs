//! Bounded, lossy delivery of finished tasks to external consumers.
//!
//! `tokio::sync::mpsc` cannot implement spec.md §4.E's backpressure policy
//! because only the `Receiver` side can pop an entry, while the policy
//! requires the *producer* to evict the oldest queued task to make room
//! for a new one when the channel is full. `FinishedQueue` is a small
//! purpose-built primitive instead: a `Mutex<VecDeque<Task<P>>>` guarded
//! by a `Notify` for the consumer side, grounded on the retry-with-timer
//! shape of `task_scheduler.go::finshed`.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tracing::warn;

use crate::task::Task;

const OFFER_RETRY_WAIT: Duration = Duration::from_millis(50);
const OFFER_MAX_ATTEMPTS: u32 = 3;

/// A bounded queue of tasks that have reached a terminal status, consumed
/// by callers via [`FinishedQueue::recv`] (mirrors the original's
/// `FinshedTasks()` channel, spec.md §4.E).
pub struct FinishedQueue<P> {
    capacity: usize,
    queue: Mutex<VecDeque<Task<P>>>,
    notify: Notify,
}

impl<P: Send + 'static> FinishedQueue<P> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queue: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            notify: Notify::new(),
        }
    }

    /// Enqueue `task`, evicting the oldest queued entry if necessary.
    ///
    /// Tries up to [`OFFER_MAX_ATTEMPTS`] times, waiting
    /// [`OFFER_RETRY_WAIT`] between attempts, on the chance a concurrent
    /// consumer drains the queue before eviction is needed. If the queue
    /// is still full after the final attempt, the oldest entry is dropped
    /// to make room -- this path is lossy by design (spec.md §4.E: "the
    /// finished-task list favors recency over completeness").
    pub async fn offer(&self, task: Task<P>) {
        for attempt in 1..=OFFER_MAX_ATTEMPTS {
            let mut queue = self.queue.lock().await;
            if queue.len() < self.capacity {
                queue.push_back(task);
                drop(queue);
                self.notify.notify_one();
                return;
            }
            drop(queue);

            if attempt == OFFER_MAX_ATTEMPTS {
                let mut queue = self.queue.lock().await;
                if let Some(dropped) = queue.pop_front() {
                    warn!(
                        dropped_task_id = %dropped.id,
                        new_task_id = %task.id,
                        "finished-task queue full, evicting oldest entry"
                    );
                }
                queue.push_back(task);
                drop(queue);
                self.notify.notify_one();
                return;
            }

            tokio::time::sleep(OFFER_RETRY_WAIT).await;
        }
    }

    /// Await the next finished task. Resolves immediately if one is
    /// already queued.
    pub async fn recv(&self) -> Task<P> {
        loop {
            {
                let mut queue = self.queue.lock().await;
                if let Some(task) = queue.pop_front() {
                    return task;
                }
            }
            self.notify.notified().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offer_then_recv_roundtrips() {
        let q: FinishedQueue<&str> = FinishedQueue::new(4);
        q.offer(Task::new("t1", 0, "p")).await;
        let got = q.recv().await;
        assert_eq!(got.id, "t1");
    }

    #[tokio::test]
    async fn full_queue_evicts_oldest() {
        let q: FinishedQueue<&str> = FinishedQueue::new(2);
        q.offer(Task::new("t1", 0, "p")).await;
        q.offer(Task::new("t2", 0, "p")).await;
        q.offer(Task::new("t3", 0, "p")).await;
        assert_eq!(q.len().await, 2);
        let first = q.recv().await;
        assert_ne!(first.id, "t1", "oldest entry should have been evicted");
    }
}
