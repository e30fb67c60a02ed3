//! Property-style checks for the container state machine's invariants
//! (spec.md §3.3 / §8), exercised directly against `orbit-memory`'s
//! reference containers rather than through a full `Scheduler` so each
//! property isolates one invariant.

use orbit_core::container::Container;
use orbit_core::error::ContainerError;
use orbit_core::task::{Task, TaskStatus};
use orbit_memory::{FifoContainer, PriorityContainer};

/// P1: once a task reaches a terminal status, no further transition on it
/// succeeds.
#[tokio::test]
async fn terminal_statuses_reject_further_transitions() {
    let container: FifoContainer<&str, ()> = FifoContainer::new();
    let task = container.add_task(Task::new("t1", 0, "p")).await.unwrap();
    let running = container.to_running_status(&task).await.unwrap();
    let failed = container
        .to_failed_status(&running, "boom".to_owned())
        .await
        .unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);

    for attempt in [
        container.to_running_status(&failed).await.err(),
        container.retry_task(&failed).await.err(),
        container.to_stop_status(&failed).await.err(),
        container.to_delete_status(&failed).await.err(),
        container
            .to_failed_status(&failed, "again".to_owned())
            .await
            .err(),
        container.to_success_status(&failed).await.err(),
    ] {
        assert!(
            matches!(attempt, Some(ContainerError::StaleStatus { .. })),
            "transition out of a terminal status must fail"
        );
    }
}

/// P2: `attempts` only changes through `retry_task`, and only increases.
#[tokio::test]
async fn attempts_only_increase_through_retry() {
    let container: FifoContainer<&str, ()> = FifoContainer::new();
    let task = container.add_task(Task::new("t1", 0, "p")).await.unwrap();
    assert_eq!(task.attempts, 0);

    let mut current = container.to_running_status(&task).await.unwrap();
    for expected in 1..=3u32 {
        current = container.retry_task(&current).await.unwrap();
        assert_eq!(current.attempts, expected);
        current = container.to_running_status(&current).await.unwrap();
    }
}

/// P3: a priority container always dispatches the lowest `priority` value
/// first, regardless of insertion order, for an arbitrary permutation.
#[tokio::test]
async fn priority_container_always_dispatches_lowest_value_first() {
    let container: PriorityContainer<&str, ()> = PriorityContainer::new();
    // A fixed, non-sorted permutation; deterministic so the test is
    // reproducible without pulling in a random number generator.
    let priorities = [7, 2, 9, 0, 5, 3, 8, 1, 6, 4];
    for (i, p) in priorities.iter().enumerate() {
        let id = format!("t{i}");
        container
            .add_task(Task::new(id, *p, "payload"))
            .await
            .unwrap();
    }

    let waiting = container.get_waiting_task(priorities.len()).await.unwrap();
    let got: Vec<i64> = waiting.iter().map(|t| t.priority).collect();
    let mut expected = priorities.to_vec();
    expected.sort();
    assert_eq!(got, expected);
}

/// P4: `add_task` never accepts a duplicate id, including one that has
/// already reached a terminal status.
#[tokio::test]
async fn duplicate_id_rejected_even_after_terminal_status() {
    let container: FifoContainer<&str, ()> = FifoContainer::new();
    let task = container.add_task(Task::new("t1", 0, "p")).await.unwrap();
    let running = container.to_running_status(&task).await.unwrap();
    container.to_success_status(&running).await.unwrap();

    let err = container
        .add_task(Task::new("t1", 0, "p"))
        .await
        .unwrap_err();
    assert!(matches!(err, ContainerError::DuplicateId(id) if id == "t1"));
}

/// P5: `get_running_task_count` always agrees with the length of
/// `get_running_task`'s result.
#[tokio::test]
async fn running_count_matches_running_list_length() {
    let container: FifoContainer<&str, ()> = FifoContainer::new();
    for i in 0..5 {
        let task = container
            .add_task(Task::new(format!("t{i}"), 0, "p"))
            .await
            .unwrap();
        if i % 2 == 0 {
            container.to_running_status(&task).await.unwrap();
        }
    }

    let count = container.get_running_task_count().await.unwrap();
    let list = container.get_running_task().await.unwrap();
    assert_eq!(count, list.len());
    assert_eq!(count, 3);
}
