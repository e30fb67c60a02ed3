//! Test fixtures shared across `orbit-core`'s and `orbit-memory`'s test
//! suites. Grounded on `gator-test-utils`'s scripted fixtures and
//! `gator-core`'s `FakeHarness`: a test preloads a script of canned
//! responses per task id, then drives the scheduler and asserts on the
//! resulting container state.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use orbit_core::actuator::{Actuator, StartOutcome};
use orbit_core::error::ActuatorError;
use orbit_core::task::{AsyncTaskStatus, Task};
use serde_json::Value;
use tokio::sync::Mutex;

/// What [`ScriptedActuator::start`] should do for a given task id.
#[derive(Debug, Clone)]
pub enum ScriptedStart {
    Accept,
    Ignore(String),
    Fail(String),
}

/// The canned responses for one task id: how it starts, what status
/// updates `get_async_task_status` returns in order, and what
/// `get_output`/`stop` should do.
#[derive(Debug, Clone, Default)]
pub struct TaskScript {
    start: Option<ScriptedStart>,
    statuses: VecDeque<AsyncTaskStatus>,
    output: Option<String>,
    output_err: Option<String>,
    init_err: Option<String>,
}

impl TaskScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, outcome: ScriptedStart) -> Self {
        self.start = Some(outcome);
        self
    }

    pub fn then_status(mut self, status: AsyncTaskStatus) -> Self {
        self.statuses.push_back(status);
        self
    }

    pub fn output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn output_err(mut self, err: impl Into<String>) -> Self {
        self.output_err = Some(err.into());
        self
    }

    pub fn init_err(mut self, err: impl Into<String>) -> Self {
        self.init_err = Some(err.into());
        self
    }
}

/// A scripted [`Actuator`] over `Payload = String`, `Output = String`.
/// Every call for a task id not given a script defaults to: accept the
/// start, report no status updates, and return an empty output.
pub struct ScriptedActuator {
    scripts: Mutex<HashMap<String, TaskScript>>,
    stop_calls: Mutex<Vec<String>>,
}

impl ScriptedActuator {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            stop_calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn script(&self, task_id: impl Into<String>, script: TaskScript) {
        self.scripts.lock().await.insert(task_id.into(), script);
    }

    pub async fn stop_calls(&self) -> Vec<String> {
        self.stop_calls.lock().await.clone()
    }
}

impl Default for ScriptedActuator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Actuator for ScriptedActuator {
    type Payload = String;
    type Output = String;

    async fn init(&self, task: Task<String>) -> Result<Task<String>, ActuatorError> {
        let scripts = self.scripts.lock().await;
        if let Some(err) = scripts.get(&task.id).and_then(|s| s.init_err.clone()) {
            return Err(ActuatorError::Init(anyhow::anyhow!(err)));
        }
        Ok(task)
    }

    async fn start(&self, task: Task<String>) -> StartOutcome<String> {
        let scripts = self.scripts.lock().await;
        let start = scripts
            .get(&task.id)
            .and_then(|s| s.start.clone())
            .unwrap_or(ScriptedStart::Accept);
        match start {
            ScriptedStart::Accept => StartOutcome::Started(task),
            ScriptedStart::Ignore(msg) => StartOutcome::Ignored {
                task,
                err: ActuatorError::Start(anyhow::anyhow!(msg)),
            },
            ScriptedStart::Fail(msg) => StartOutcome::Failed(ActuatorError::Start(anyhow::anyhow!(msg))),
        }
    }

    async fn get_async_task_status(
        &self,
        tasks: &[Task<String>],
    ) -> Result<Vec<AsyncTaskStatus>, ActuatorError> {
        let mut scripts = self.scripts.lock().await;
        let statuses = tasks
            .iter()
            .map(|task| {
                scripts
                    .get_mut(&task.id)
                    .and_then(|s| s.statuses.pop_front())
                    .unwrap_or(AsyncTaskStatus::Running {
                        progress: Value::Null,
                    })
            })
            .collect();
        Ok(statuses)
    }

    async fn get_output(&self, task: &Task<String>) -> Result<String, ActuatorError> {
        let scripts = self.scripts.lock().await;
        let Some(script) = scripts.get(&task.id) else {
            return Ok(String::new());
        };
        if let Some(err) = &script.output_err {
            return Err(ActuatorError::Output(anyhow::anyhow!(err.clone())));
        }
        Ok(script.output.clone().unwrap_or_default())
    }

    async fn stop(&self, task: &Task<String>) -> Result<(), ActuatorError> {
        self.stop_calls.lock().await.push(task.id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_script_accepts_and_reports_nothing() {
        let actuator = ScriptedActuator::new();
        let task = Task::new("t1", 0, "payload".to_owned());
        match actuator.start(task.clone()).await {
            StartOutcome::Started(started) => assert_eq!(started.id, "t1"),
            other => panic!("expected Started, got {other:?}"),
        }
        let statuses = actuator.get_async_task_status(&[task]).await.unwrap();
        assert!(matches!(
            statuses[0],
            AsyncTaskStatus::Running { ref progress } if progress.is_null()
        ));
    }

    #[tokio::test]
    async fn scripted_failure_start_is_reported() {
        let actuator = ScriptedActuator::new();
        actuator
            .script("t1", TaskScript::new().start(ScriptedStart::Fail("boom".into())))
            .await;
        let task = Task::new("t1", 0, "payload".to_owned());
        match actuator.start(task).await {
            StartOutcome::Failed(_) => {}
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
