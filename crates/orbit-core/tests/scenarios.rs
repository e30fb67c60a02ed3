//! End-to-end scenarios driving a real [`Scheduler`] against
//! `orbit-memory`'s `FifoContainer` and `orbit-test-utils`'s
//! `ScriptedActuator`.

use std::sync::Arc;
use std::time::Duration;

use orbit_core::container::Container;
use orbit_core::task::{AsyncTaskStatus, Task, TaskStatus};
use orbit_core::{Scheduler, SchedulerConfig};
use orbit_memory::FifoContainer;
use orbit_test_utils::{ScriptedActuator, ScriptedStart, TaskScript};
use tokio::time::timeout;

fn fast_config(task_limit: usize, max_failed_attempts: u32) -> SchedulerConfig {
    SchedulerConfig {
        task_limit,
        scan_interval: Duration::from_millis(10),
        task_timeout: Some(Duration::from_secs(60)),
        max_failed_attempts,
        enable_finished_task_list: true,
        finished_task_capacity: 16,
        enable_state_poll: true,
        poll_interval: Duration::from_millis(10),
        enable_state_callback: false,
    }
}

async fn expect_finished(scheduler: &Arc<Scheduler<String, String>>) -> Task<String> {
    timeout(Duration::from_secs(5), scheduler.finished_tasks())
        .await
        .expect("task should finish within timeout")
        .expect("finished_task_list is enabled")
}

#[tokio::test]
async fn happy_path_runs_to_success() {
    let container = Arc::new(FifoContainer::<String, String>::new());
    let actuator = Arc::new(ScriptedActuator::new());
    actuator
        .script("t1", TaskScript::new().then_status(AsyncTaskStatus::Success).output("done"))
        .await;

    let scheduler = Arc::new(
        Scheduler::new(fast_config(4, 3), container, actuator, None).expect("valid config"),
    );
    scheduler.start().await;

    scheduler
        .add_task(Task::new("t1", 0, "payload".to_owned()))
        .await
        .expect("add_task");

    let finished = expect_finished(&scheduler).await;
    assert_eq!(finished.id, "t1");
    assert_eq!(finished.status, TaskStatus::Success);

    scheduler.close().await;
}

#[tokio::test]
async fn retry_then_succeed() {
    let container = Arc::new(FifoContainer::<String, String>::new());
    let actuator = Arc::new(ScriptedActuator::new());
    actuator
        .script(
            "t1",
            TaskScript::new()
                .then_status(AsyncTaskStatus::Failed {
                    reason: "transient".to_owned(),
                })
                .then_status(AsyncTaskStatus::Success)
                .output("done"),
        )
        .await;

    let scheduler = Arc::new(
        Scheduler::new(fast_config(4, 3), container, actuator, None).expect("valid config"),
    );
    scheduler.start().await;

    scheduler
        .add_task(Task::new("t1", 0, "payload".to_owned()))
        .await
        .expect("add_task");

    let finished = expect_finished(&scheduler).await;
    assert_eq!(finished.status, TaskStatus::Success);
    assert_eq!(finished.attempts, 1, "one retry should have been consumed");

    scheduler.close().await;
}

#[tokio::test]
async fn retry_exhausted_fails_permanently() {
    let container = Arc::new(FifoContainer::<String, String>::new());
    let actuator = Arc::new(ScriptedActuator::new());
    actuator
        .script(
            "t1",
            TaskScript::new()
                .then_status(AsyncTaskStatus::Failed {
                    reason: "transient".to_owned(),
                })
                .then_status(AsyncTaskStatus::Failed {
                    reason: "permanent".to_owned(),
                }),
        )
        .await;

    // max_failed_attempts = 1: the first failure consumes the only retry
    // (attempts 0 -> 1), the second is terminal.
    let scheduler = Arc::new(
        Scheduler::new(fast_config(4, 1), container, actuator, None).expect("valid config"),
    );
    scheduler.start().await;

    scheduler
        .add_task(Task::new("t1", 0, "payload".to_owned()))
        .await
        .expect("add_task");

    let finished = expect_finished(&scheduler).await;
    assert_eq!(finished.status, TaskStatus::Failed);
    assert_eq!(finished.failed_reason, "permanent");
    assert_eq!(finished.attempts, 1, "one retry should have been consumed before the terminal failure");

    scheduler.close().await;
}

#[tokio::test]
async fn timed_out_task_is_failed() {
    let container = Arc::new(FifoContainer::<String, String>::new());
    let actuator = Arc::new(ScriptedActuator::new());
    // No scripted status: the task never self-reports, so only the
    // timeout path can resolve it.

    let mut config = fast_config(4, 1);
    config.task_timeout = Some(Duration::from_millis(30));

    let scheduler =
        Arc::new(Scheduler::new(config, container, actuator, None).expect("valid config"));
    scheduler.start().await;

    scheduler
        .add_task(Task::new("t1", 0, "payload".to_owned()))
        .await
        .expect("add_task");

    let finished = expect_finished(&scheduler).await;
    assert_eq!(finished.status, TaskStatus::Failed);
    assert!(finished.failed_reason.contains("timeout"));

    scheduler.close().await;
}

#[tokio::test]
async fn ignored_start_leaves_task_waiting_for_next_cycle() {
    let container = Arc::new(FifoContainer::<String, String>::new());
    let actuator = Arc::new(ScriptedActuator::new());
    actuator
        .script(
            "t1",
            TaskScript::new()
                .start(ScriptedStart::Ignore("not ready yet".to_owned()))
                .then_status(AsyncTaskStatus::Success),
        )
        .await;

    let scheduler = Arc::new(
        Scheduler::new(fast_config(4, 3), container.clone(), actuator, None)
            .expect("valid config"),
    );
    scheduler.start().await;

    scheduler
        .add_task(Task::new("t1", 0, "payload".to_owned()))
        .await
        .expect("add_task");

    // The actuator always ignores the start attempt, so the task should
    // still be waiting a short while later, never having become Running.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let waiting = container.get_waiting_task(10).await.expect("get_waiting_task");
    assert!(waiting.iter().any(|t| t.id == "t1"));

    scheduler.close().await;
}

#[tokio::test]
async fn dual_status_sources_do_not_double_finish() {
    // Both poll and callback active; a callback-pushed Success and a
    // poll-discovered Success for the same task should be suppressed down
    // to a single terminal transition.
    let container = Arc::new(FifoContainer::<String, String>::new());
    let actuator = Arc::new(ScriptedActuator::new());
    actuator
        .script(
            "t1",
            TaskScript::new().then_status(AsyncTaskStatus::Success).output("done"),
        )
        .await;

    let mut config = fast_config(4, 3);
    config.enable_state_callback = true;

    let scheduler =
        Arc::new(Scheduler::new(config, container, actuator, None).expect("valid config"));
    scheduler.start().await;

    let sink = scheduler.callback_sink().expect("callback enabled");

    scheduler
        .add_task(Task::new("t1", 0, "payload".to_owned()))
        .await
        .expect("add_task");

    // Race a duplicate callback-path report against the poll loop's own
    // discovery of the same terminal status.
    use orbit_core::CallbackReceiver;
    sink.on_status_change("t1", AsyncTaskStatus::Success).await;

    let finished = expect_finished(&scheduler).await;
    assert_eq!(finished.id, "t1");
    assert_eq!(finished.status, TaskStatus::Success);

    // No second finished task should show up for the same id.
    let second = timeout(Duration::from_millis(200), scheduler.finished_tasks()).await;
    assert!(second.is_err(), "task should only finish once");

    scheduler.close().await;
}
