//! The scheduler engine: concurrency-bounded dispatch, dual status
//! maintenance (poll + callback) with duplicate suppression, retry and
//! timeout handling, and the bounded finished-task export channel.
//!
//! Grounded on `gator-core/src/orchestrator/mod.rs` (the semaphore-bounded
//! dispatch loop and cancellation-drain shutdown) and `task_scheduler.go`
//! (the dispatch/poll loop semantics and retry bookkeeping this crate
//! ports from Go).

mod callback_loop;
mod dispatch;
mod poll;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::actuator::Actuator;
use crate::callback::CallbackReceiver;
use crate::container::Container;
use crate::error::SchedulerConfigError;
use crate::finished::FinishedQueue;
use crate::persistencer::Persistencer;
use crate::suppression::SuppressionWindow;
use crate::task::{AsyncTaskStatus, Task};

/// Tuning knobs for a [`Scheduler`]. Field names follow `task_scheduler.go`'s
/// `Config` struct (`TaskLimit`, `ScanInterval`, `TaskTimeout`,
/// `EnableFinshedTaskList`), renamed to Rust's snake_case and extended with
/// the poll/callback toggles this port exposes separately rather than
/// inferring from which fields are non-nil.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of concurrently running tasks.
    pub task_limit: usize,
    /// How often the dispatch loop looks for waiting tasks to start.
    pub scan_interval: Duration,
    /// A running task exceeding this age is failed with a timeout reason.
    /// `None` disables timeout enforcement.
    pub task_timeout: Option<Duration>,
    /// Retry budget per task (spec.md's `MaxFailedAttempts`). A task whose
    /// `attempts` has already reached this value is marked `Failed`
    /// permanently on its next failure instead of being returned to
    /// `Waiting`. `0` means no retries.
    pub max_failed_attempts: u32,
    /// Whether finished tasks are buffered for [`Scheduler::finished_tasks`].
    pub enable_finished_task_list: bool,
    /// Capacity of the finished-task queue, when enabled.
    pub finished_task_capacity: usize,
    /// Whether the status-poll loop is active.
    pub enable_state_poll: bool,
    /// How often the status-poll loop queries the actuator for running
    /// tasks' status.
    pub poll_interval: Duration,
    /// Whether a [`CallbackReceiver`] sink is registered for push-based
    /// status updates.
    pub enable_state_callback: bool,
}

impl SchedulerConfig {
    /// Validate the configuration (spec.md §4.A): at least one status
    /// source must be active, and the concurrency bound must be positive.
    pub fn validate(&self) -> Result<(), SchedulerConfigError> {
        if self.task_limit == 0 {
            return Err(SchedulerConfigError::ZeroTaskLimit);
        }
        if !self.enable_state_poll && !self.enable_state_callback {
            return Err(SchedulerConfigError::NoStatusSource);
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            task_limit: 20,
            scan_interval: Duration::from_millis(500),
            task_timeout: Some(Duration::from_secs(300)),
            max_failed_attempts: 3,
            enable_finished_task_list: true,
            finished_task_capacity: 256,
            enable_state_poll: true,
            poll_interval: Duration::from_secs(1),
            enable_state_callback: false,
        }
    }
}

/// Bound on concurrently spawned per-task work within a single dispatch or
/// poll cycle (spec.md §5). Distinct from `task_limit`, which bounds the
/// number of simultaneously `Running` tasks; this bounds how much of that
/// work a single cycle fans out to `tokio::spawn` at once.
const PER_CYCLE_PARALLELISM: usize = 20;

type ContainerHandle<P, O> = Arc<dyn Container<Payload = P, Output = O>>;
type ActuatorHandle<P, O> = Arc<dyn Actuator<Payload = P, Output = O>>;
type PersistencerHandle<P, O> = Arc<dyn Persistencer<Payload = P, Output = O>>;

/// The scheduling engine. Generic over the opaque payload type `P` and
/// output type `O`; storage and execution backends are type-erased behind
/// `Arc<dyn Container<...>>` / `Arc<dyn Actuator<...>>` so a caller can mix
/// concrete implementations (e.g. [`crate::composite::CompositeContainer`])
/// without the engine itself needing to know about them.
pub struct Scheduler<P, O>
where
    P: Send + Sync + Clone + 'static,
    O: Send + Sync + 'static,
{
    pub(crate) container: ContainerHandle<P, O>,
    pub(crate) actuator: ActuatorHandle<P, O>,
    pub(crate) persistencer: Option<PersistencerHandle<P, O>>,
    pub(crate) config: SchedulerConfig,
    pub(crate) cancel: CancellationToken,
    pub(crate) semaphore: Arc<Semaphore>,
    pub(crate) suppression: Arc<SuppressionWindow>,
    pub(crate) finished: Option<Arc<FinishedQueue<P>>>,
    pub(crate) callback_tx: Option<mpsc::UnboundedSender<(String, AsyncTaskStatus)>>,
    callback_rx: Mutex<Option<mpsc::UnboundedReceiver<(String, AsyncTaskStatus)>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Sink handed to actuators (or whatever bridges them to the outside
/// world) so they can push status updates into the scheduler's callback
/// loop. Returned by [`Scheduler::callback_sink`].
struct ChannelCallbackReceiver {
    tx: mpsc::UnboundedSender<(String, AsyncTaskStatus)>,
}

#[async_trait::async_trait]
impl CallbackReceiver for ChannelCallbackReceiver {
    async fn on_status_change(&self, task_id: &str, status: AsyncTaskStatus) {
        let _ = self.tx.send((task_id.to_owned(), status));
    }
}

impl<P, O> Scheduler<P, O>
where
    P: Send + Sync + Clone + 'static,
    O: Send + Sync + 'static,
{
    /// Construct a scheduler. Does not start any background loops; call
    /// [`Scheduler::start`] for that. Mirrors `task_scheduler.go`'s split
    /// between `MakeNewScheduler` (construct + validate) and the goroutine
    /// it spawns internally -- here made explicit as a separate `start`.
    pub fn new(
        config: SchedulerConfig,
        container: ContainerHandle<P, O>,
        actuator: ActuatorHandle<P, O>,
        persistencer: Option<PersistencerHandle<P, O>>,
    ) -> Result<Self, SchedulerConfigError> {
        config.validate()?;

        let finished = config
            .enable_finished_task_list
            .then(|| Arc::new(FinishedQueue::new(config.finished_task_capacity)));

        let (callback_tx, callback_rx) = if config.enable_state_callback {
            let (tx, rx) = mpsc::unbounded_channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(PER_CYCLE_PARALLELISM)),
            container,
            actuator,
            persistencer,
            cancel: CancellationToken::new(),
            suppression: Arc::new(SuppressionWindow::new()),
            finished,
            callback_tx,
            callback_rx: Mutex::new(callback_rx),
            handles: Mutex::new(Vec::new()),
            config,
        })
    }

    /// A [`CallbackReceiver`] implementation that forwards into this
    /// scheduler's callback loop. `None` if `enable_state_callback` was
    /// not set.
    pub fn callback_sink(&self) -> Option<Arc<dyn CallbackReceiver>> {
        self.callback_tx
            .clone()
            .map(|tx| Arc::new(ChannelCallbackReceiver { tx }) as Arc<dyn CallbackReceiver>)
    }

    /// Spawn the dispatch loop, and (depending on config) the status-poll
    /// loop, the callback-drain loop, and the suppression-window sweeper.
    #[instrument(skip_all, fields(task_limit = self.config.task_limit))]
    pub async fn start(self: &Arc<Self>) {
        info!("starting scheduler");
        let mut handles = self.handles.lock().await;

        let dispatch_self = Arc::clone(self);
        handles.push(tokio::spawn(async move { dispatch_self.dispatch_loop().await }));

        if self.config.enable_state_poll {
            let poll_self = Arc::clone(self);
            handles.push(tokio::spawn(async move { poll_self.poll_loop().await }));
        }

        if self.config.enable_state_callback {
            let callback_self = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                callback_self.callback_loop().await
            }));
        }

        let sweep_self = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SuppressionWindow::sweep_interval());
            loop {
                tokio::select! {
                    _ = sweep_self.cancel.cancelled() => return,
                    _ = ticker.tick() => sweep_self.suppression.sweep().await,
                }
            }
        }));
    }

    /// Submit a new task: init via the actuator, then add via the
    /// container (spec.md §6.2).
    pub async fn add_task(
        &self,
        task: Task<P>,
    ) -> Result<Task<P>, crate::error::AddTaskError> {
        let task = self.actuator.init(task).await?;
        Ok(self.container.add_task(task).await?)
    }

    /// Request a running (or waiting) task be stopped.
    pub async fn stop_task(
        &self,
        task: &Task<P>,
    ) -> Result<Task<P>, crate::error::ContainerError> {
        if task.status == crate::task::TaskStatus::Running {
            let _ = self.actuator.stop(task).await;
        }
        self.container.to_stop_status(task).await
    }

    /// Await the next finished task, when `enable_finished_task_list` is
    /// set. Returns `None` immediately if the feature is disabled.
    pub async fn finished_tasks(&self) -> Option<Task<P>> {
        match &self.finished {
            Some(queue) => Some(queue.recv().await),
            None => None,
        }
    }

    /// Cancel all background loops and wait for them to finish. Mirrors
    /// `task_scheduler.go`'s `Close`, which cancels the root context and
    /// drains in-flight work before returning.
    pub async fn close(&self) {
        info!("stopping scheduler");
        self.cancel.cancel();
        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
    }
}
