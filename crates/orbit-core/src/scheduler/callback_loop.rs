//! Callback-drain loop: applies status updates pushed through
//! [`crate::callback::CallbackReceiver`] instead of (or alongside) the
//! poll loop. Shares [`super::Scheduler::apply_status`] with `poll.rs` so
//! duplicate suppression behaves identically regardless of which path a
//! status update arrived through.

use std::sync::Arc;

use tracing::debug;

use super::Scheduler;

impl<P, O> Scheduler<P, O>
where
    P: Send + Sync + Clone + 'static,
    O: Send + Sync + 'static,
{
    pub(super) async fn callback_loop(self: Arc<Self>) {
        let mut rx = match self.callback_rx.lock().await.take() {
            Some(rx) => rx,
            None => return,
        };

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("callback loop stopping");
                    return;
                }
                msg = rx.recv() => {
                    match msg {
                        Some((task_id, status)) => self.apply_status(&task_id, status).await,
                        None => {
                            debug!("callback channel closed");
                            return;
                        }
                    }
                }
            }
        }
    }
}
