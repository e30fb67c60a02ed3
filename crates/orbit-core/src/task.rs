//! Task record and status lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a [`Task`].
///
/// ```text
/// Unstart --AddTask--> Waiting --dispatch--> Running -+- success -> Exporting -> Success (terminal)
///                          |                           |- failure (attempts<max) -> Waiting
///                          |                           |- failure (attempts=max) -> Failed (terminal)
///                          |                           `- timeout -----------------> Failed (terminal)
///                          |
///                          |- StopTask --> Stopped (terminal)
///                          `- delete ----> Deleted (terminal)
/// ```
///
/// `Exporting` is entered only when a `Persistencer` is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Invalid,
    Unstart,
    Waiting,
    Running,
    Success,
    Failed,
    Stopped,
    Deleted,
    Exporting,
}

impl TaskStatus {
    /// Terminal statuses admit no further transitions (spec.md §3.3 invariant 2).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Deleted)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Invalid => "invalid",
            Self::Unstart => "unstart",
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
            Self::Deleted => "deleted",
            Self::Exporting => "exporting",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = TaskStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invalid" => Ok(Self::Invalid),
            "unstart" => Ok(Self::Unstart),
            "waiting" => Ok(Self::Waiting),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "stopped" => Ok(Self::Stopped),
            "deleted" => Ok(Self::Deleted),
            "exporting" => Ok(Self::Exporting),
            other => Err(TaskStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskStatus`] string.
#[derive(Debug, Clone)]
pub struct TaskStatusParseError(pub String);

impl fmt::Display for TaskStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task status: {:?}", self.0)
    }
}

impl std::error::Error for TaskStatusParseError {}

/// An addressable unit of deferred work.
///
/// `P` is the opaque, caller-defined payload type; the scheduler never
/// introspects it, only the `Actuator` does (spec.md §9 "opaque payload").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task<P> {
    /// Globally unique within the scheduler. Assigned by the caller.
    pub id: String,
    /// Lower numeric value = earlier scheduling (Container-defined ordering).
    pub priority: i64,
    pub payload: P,
    pub status: TaskStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Non-empty only in `Failed`.
    pub failed_reason: String,
    /// Number of retries consumed; monotone non-decreasing over the id's lifetime.
    pub attempts: u32,
}

impl<P> Task<P> {
    /// Construct a new task in `Unstart`, ready for `Container::add_task`.
    pub fn new(id: impl Into<String>, priority: i64, payload: P) -> Self {
        Self {
            id: id.into(),
            priority,
            payload,
            status: TaskStatus::Unstart,
            start_time: None,
            end_time: None,
            failed_reason: String::new(),
            attempts: 0,
        }
    }
}

/// The status of a task under asynchronous execution, as reported in a
/// batch by [`crate::actuator::Actuator::get_async_task_status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AsyncTaskStatus {
    Running { progress: Value },
    Success,
    Failed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_display_roundtrip() {
        let variants = [
            TaskStatus::Invalid,
            TaskStatus::Unstart,
            TaskStatus::Waiting,
            TaskStatus::Running,
            TaskStatus::Success,
            TaskStatus::Failed,
            TaskStatus::Stopped,
            TaskStatus::Deleted,
            TaskStatus::Exporting,
        ];
        for v in variants {
            let s = v.to_string();
            let parsed: TaskStatus = s.parse().expect("should parse");
            assert_eq!(v, parsed);
        }
    }

    #[test]
    fn task_status_invalid_string() {
        assert!("bogus".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Deleted.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::Stopped.is_terminal());
        assert!(!TaskStatus::Waiting.is_terminal());
    }

    #[test]
    fn new_task_starts_unstart_with_zero_attempts() {
        let task = Task::new("t1", 5, "payload");
        assert_eq!(task.status, TaskStatus::Unstart);
        assert_eq!(task.attempts, 0);
        assert!(task.start_time.is_none());
        assert!(task.end_time.is_none());
        assert!(task.failed_reason.is_empty());
    }
}
