//! The [`CallbackReceiver`] trait -- push-based status updates.
//!
//! An alternative (or complement) to the status-poll loop: an `Actuator`
//! implementation that can push status changes as they happen registers a
//! `CallbackReceiver` with the scheduler instead of, or alongside, relying
//! on [`crate::actuator::Actuator::get_async_task_status`] being polled.
//! Grounded on `callback_receiver.go`.

use async_trait::async_trait;

use crate::task::AsyncTaskStatus;

/// Receives out-of-band status updates for a running task, keyed by task
/// id. The scheduler subscribes a channel-backed implementation of this
/// trait when `enable_state_callback` is set on
/// [`crate::scheduler::SchedulerConfig`].
#[async_trait]
pub trait CallbackReceiver: Send + Sync {
    /// Called by the actuator (or whatever bridges it to the outside
    /// world) whenever a running task's status changes.
    async fn on_status_change(&self, task_id: &str, status: AsyncTaskStatus);
}
