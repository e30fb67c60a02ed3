//! Duplicate-suppression window for the status-poll and callback loops.
//!
//! When both polling and callbacks are enabled, the same terminal
//! transition for a task can arrive from either path within a short
//! window. `SuppressionWindow` records recently-applied task ids so the
//! second arrival is dropped instead of attempting a stale CAS transition
//! (spec.md §4.F). No teacher analogue; original_source's ring-buffer
//! design is deliberately not mirrored (see `DESIGN.md` Open Question 1).

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

const CAPACITY: usize = 10_000;
const SWEEP_INTERVAL: Duration = Duration::from_secs(3);
const ENTRY_TTL: Duration = Duration::from_secs(5);

struct Inner {
    seen: HashSet<String>,
    order: VecDeque<(String, Instant)>,
}

/// Tracks task ids that have recently had a terminal status applied, so a
/// second path (poll vs callback) reporting the same outcome is a no-op.
pub struct SuppressionWindow {
    inner: Mutex<Inner>,
}

impl SuppressionWindow {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                seen: HashSet::with_capacity(CAPACITY),
                order: VecDeque::with_capacity(CAPACITY),
            }),
        }
    }

    /// Returns `true` if `task_id` was newly recorded (caller should
    /// proceed), or `false` if it was already present (caller should skip).
    pub async fn record(&self, task_id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.seen.contains(task_id) {
            return false;
        }
        if inner.order.len() >= CAPACITY {
            if let Some((oldest, _)) = inner.order.pop_front() {
                inner.seen.remove(&oldest);
            }
        }
        inner.seen.insert(task_id.to_owned());
        inner.order.push_back((task_id.to_owned(), Instant::now()));
        true
    }

    /// Drop entries older than [`ENTRY_TTL`]. Intended to run on a
    /// [`SWEEP_INTERVAL`] tick for the lifetime of the scheduler.
    pub async fn sweep(&self) {
        let mut inner = self.inner.lock().await;
        let cutoff = Instant::now();
        while let Some((id, seen_at)) = inner.order.front() {
            if cutoff.duration_since(*seen_at) < ENTRY_TTL {
                break;
            }
            let id = id.clone();
            inner.order.pop_front();
            inner.seen.remove(&id);
        }
    }

    pub fn sweep_interval() -> Duration {
        SWEEP_INTERVAL
    }
}

impl Default for SuppressionWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_record_succeeds_second_is_suppressed() {
        let window = SuppressionWindow::new();
        assert!(window.record("t1").await);
        assert!(!window.record("t1").await);
    }

    #[tokio::test]
    async fn distinct_ids_are_independent() {
        let window = SuppressionWindow::new();
        assert!(window.record("a").await);
        assert!(window.record("b").await);
    }

    #[tokio::test]
    async fn sweep_evicts_stale_entries() {
        let window = SuppressionWindow::new();
        assert!(window.record("t1").await);
        {
            let mut inner = window.inner.lock().await;
            let entry = inner.order.front_mut().unwrap();
            entry.1 -= ENTRY_TTL + Duration::from_secs(1);
        }
        window.sweep().await;
        assert!(window.record("t1").await);
    }
}
