use super::events::{ControllerPhase, ControllerStatus, TaskEvent};
use crate::domain::{
    CompareError, CompareParams, ComparisonRow, JobId, SubmissionMode, TaskPhase, TaskSnapshot,
    TaskState, Transition,
};
use crate::infra::service::ComparisonService;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Opaque reference to a submitted job.
///
/// The handle can always answer synchronously whether the controller still
/// tracks the job.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    job_id: JobId,
    token: CancellationToken,
}

impl TaskHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// False once the job was cancelled, replaced or its result consumed.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

struct ActiveJob {
    handle: TaskHandle,
    state: TaskState,
    rows: Option<Vec<ComparisonRow>>,
    error: Option<CompareError>,
    fetch_started: bool,
    poll_gate: Arc<tokio::sync::Mutex<()>>,
    driver: Option<JoinHandle<()>>,
}

impl ActiveJob {
    fn new(job_id: JobId) -> Self {
        Self {
            handle: TaskHandle {
                job_id: job_id.clone(),
                token: CancellationToken::new(),
            },
            state: TaskState::submitted(job_id),
            rows: None,
            error: None,
            fetch_started: false,
            poll_gate: Arc::new(tokio::sync::Mutex::new(())),
            driver: None,
        }
    }

    fn release(mut self) {
        self.handle.token.cancel();
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }

    fn fail(&mut self, error: CompareError, events: &mpsc::UnboundedSender<TaskEvent>) {
        self.state.phase = TaskPhase::Failed;
        self.state.status_message = error.to_string();
        self.error = Some(error.clone());
        let _ = events.send(TaskEvent::Failed {
            job_id: self.handle.job_id.clone(),
            error,
        });
    }
}

#[derive(Default)]
struct Slot {
    job: Option<ActiveJob>,
    submitting: bool,
    generation: u64,
}

impl Slot {
    fn current_mut(&mut self, handle: &TaskHandle) -> Option<&mut ActiveJob> {
        if handle.token.is_cancelled() {
            return None;
        }
        self.job
            .as_mut()
            .filter(|job| job.handle.job_id == handle.job_id)
    }
}

struct Shared {
    service: Arc<dyn ComparisonService>,
    slot: Mutex<Slot>,
    events: mpsc::UnboundedSender<TaskEvent>,
    interval: Duration,
}

/// Drives one comparison job at a time from submission to a terminal phase.
///
/// Polling runs on a spawned task at a fixed cadence. Dropping the controller
/// or calling [`TaskController::cancel`] stops it immediately; responses that
/// arrive afterwards are discarded.
pub struct TaskController {
    shared: Arc<Shared>,
}

impl TaskController {
    pub fn new(
        service: Arc<dyn ComparisonService>,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<TaskEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            shared: Arc::new(Shared {
                service,
                slot: Mutex::new(Slot::default()),
                events,
                interval: poll_interval,
            }),
        };
        (controller, receiver)
    }

    /// Validate and submit a comparison.
    ///
    /// Rejected with [`CompareError::Conflict`] while another job is not yet
    /// terminal. A terminal job that was never consumed is discarded.
    pub async fn submit(&self, params: CompareParams) -> Result<TaskHandle, CompareError> {
        params.validate()?;

        let generation = {
            let mut slot = self.shared.slot.lock();
            if slot.submitting {
                return Err(CompareError::Conflict {
                    active: "pending submission".to_string(),
                });
            }
            if let Some(job) = &slot.job
                && !job.state.phase.is_terminal()
            {
                return Err(CompareError::Conflict {
                    active: job.handle.job_id.clone(),
                });
            }
            if let Some(previous) = slot.job.take() {
                log::debug!("Discarding previous job {}", previous.handle.job_id);
                previous.release();
            }
            slot.submitting = true;
            slot.generation += 1;
            slot.generation
        };
        let _guard = SubmitGuard {
            shared: &self.shared,
            generation,
        };

        let log_rejection = |e: &CompareError| log::warn!("Submission rejected: {}", e);
        match params.mode {
            SubmissionMode::Async => {
                let job_id = self
                    .shared
                    .service
                    .start_task(&params)
                    .await
                    .inspect_err(log_rejection)?;
                self.install_async(job_id, generation)
            }
            SubmissionMode::Sync => {
                let rows = self
                    .shared
                    .service
                    .compare(&params)
                    .await
                    .inspect_err(log_rejection)?;
                self.install_sync(rows, generation)
            }
        }
    }

    fn install_async(&self, job_id: JobId, generation: u64) -> Result<TaskHandle, CompareError> {
        let mut slot = self.shared.slot.lock();
        if slot.generation != generation {
            log::info!("Job {} was cancelled during submission", job_id);
            return Err(CompareError::Cancelled);
        }
        slot.submitting = false;

        let mut job = ActiveJob::new(job_id.clone());
        let handle = job.handle.clone();
        let _ = self.shared.events.send(TaskEvent::Submitted {
            job_id: job_id.clone(),
        });
        log::info!("Comparison job {} submitted", job_id);

        job.driver = Some(tokio::spawn(drive(
            Arc::clone(&self.shared),
            handle.clone(),
        )));
        slot.job = Some(job);
        Ok(handle)
    }

    fn install_sync(
        &self,
        rows: Vec<ComparisonRow>,
        generation: u64,
    ) -> Result<TaskHandle, CompareError> {
        let mut slot = self.shared.slot.lock();
        if slot.generation != generation {
            return Err(CompareError::Cancelled);
        }
        slot.submitting = false;

        let job_id = format!("sync-{}", uuid::Uuid::new_v4());
        let mut job = ActiveJob::new(job_id.clone());
        job.state
            .apply(&TaskSnapshot::new(TaskPhase::Completed, 100, "completed"));
        job.fetch_started = true;
        let row_count = rows.len();
        job.rows = Some(rows);

        let _ = self.shared.events.send(TaskEvent::Submitted {
            job_id: job_id.clone(),
        });
        let _ = self.shared.events.send(TaskEvent::Completed {
            job_id: job_id.clone(),
            row_count,
        });
        log::info!("Synchronous comparison returned {} rows", row_count);

        let handle = job.handle.clone();
        slot.job = Some(job);
        Ok(handle)
    }

    /// Query the job once and fold the answer into the tracked state.
    ///
    /// Concurrent polls of the same job are serialized, so progress observed
    /// by one caller never goes backwards.
    pub async fn poll(&self, handle: &TaskHandle) -> Result<TaskSnapshot, CompareError> {
        poll_job(&self.shared, handle).await
    }

    /// Hand over the rows of a completed job and return to idle.
    ///
    /// Succeeds once per job; afterwards the handle is expired. Before the
    /// rows have arrived this returns [`CompareError::NotReady`].
    pub fn fetch_result(&self, handle: &TaskHandle) -> Result<Vec<ComparisonRow>, CompareError> {
        let mut slot = self.shared.slot.lock();
        let Some(job) = slot.current_mut(handle) else {
            return Err(CompareError::NotFound(handle.job_id.clone()));
        };
        if let Some(rows) = job.rows.take() {
            if let Some(job) = slot.job.take() {
                job.release();
            }
            return Ok(rows);
        }
        match &job.error {
            Some(error) => Err(error.clone()),
            None => Err(CompareError::NotReady(handle.job_id.clone())),
        }
    }

    /// Stop tracking the current job, whatever its phase, and return to idle.
    pub fn cancel(&self) {
        let mut slot = self.shared.slot.lock();
        slot.generation += 1;
        slot.submitting = false;
        if let Some(job) = slot.job.take() {
            if !job.state.phase.is_terminal() {
                log::info!("Comparison job {} cancelled", job.handle.job_id);
                let _ = self.shared.events.send(TaskEvent::Cancelled {
                    job_id: job.handle.job_id.clone(),
                });
            }
            job.release();
        }
    }

    /// Whether a submission or a non-terminal job is in flight.
    pub fn is_busy(&self) -> bool {
        let slot = self.shared.slot.lock();
        slot.submitting
            || slot
                .job
                .as_ref()
                .is_some_and(|job| !job.state.phase.is_terminal())
    }

    pub fn status(&self) -> ControllerStatus {
        let slot = self.shared.slot.lock();
        let Some(job) = &slot.job else {
            return ControllerStatus {
                phase: if slot.submitting {
                    ControllerPhase::Submitted
                } else {
                    ControllerPhase::Idle
                },
                ..Default::default()
            };
        };
        let phase = match job.state.phase {
            TaskPhase::Submitted => ControllerPhase::Submitted,
            TaskPhase::Running => ControllerPhase::Running,
            TaskPhase::Completed if job.rows.is_some() => ControllerPhase::Completed,
            TaskPhase::Completed if job.error.is_some() => ControllerPhase::Failed,
            TaskPhase::Completed => ControllerPhase::Running,
            TaskPhase::Failed => ControllerPhase::Failed,
        };
        ControllerStatus {
            phase,
            job_id: Some(job.handle.job_id.clone()),
            progress: job.state.progress,
            status_message: job.state.status_message.clone(),
            error: job.error.clone(),
        }
    }
}

impl Drop for TaskController {
    fn drop(&mut self) {
        let mut slot = self.shared.slot.lock();
        slot.generation += 1;
        if let Some(job) = slot.job.take() {
            job.release();
        }
    }
}

struct SubmitGuard<'a> {
    shared: &'a Arc<Shared>,
    generation: u64,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.shared.slot.lock();
        if slot.generation == self.generation {
            slot.submitting = false;
        }
    }
}

async fn drive(shared: Arc<Shared>, handle: TaskHandle) {
    let mut ticker = tokio::time::interval(shared.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the first poll waits one interval.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = handle.token.cancelled() => return,
            _ = ticker.tick() => {}
        }

        match poll_job(&shared, &handle).await {
            Ok(snapshot) if snapshot.phase == TaskPhase::Completed => {
                retrieve(&shared, &handle).await;
                return;
            }
            Ok(snapshot) if snapshot.phase == TaskPhase::Failed => return,
            Ok(_) => {}
            Err(_) => return,
        }
    }
}

async fn poll_job(shared: &Shared, handle: &TaskHandle) -> Result<TaskSnapshot, CompareError> {
    let gate = {
        let mut slot = shared.slot.lock();
        let job = slot
            .current_mut(handle)
            .ok_or_else(|| CompareError::NotFound(handle.job_id.clone()))?;
        if job.state.phase.is_terminal() {
            return Ok(job.state.snapshot());
        }
        Arc::clone(&job.poll_gate)
    };
    let _serialized = gate.lock().await;
    {
        let mut slot = shared.slot.lock();
        let job = slot
            .current_mut(handle)
            .ok_or(CompareError::Cancelled)?;
        if job.state.phase.is_terminal() {
            return Ok(job.state.snapshot());
        }
    }

    let observed = tokio::select! {
        biased;
        _ = handle.token.cancelled() => return Err(CompareError::Cancelled),
        observed = shared.service.progress(&handle.job_id) => observed,
    };

    let mut slot = shared.slot.lock();
    let Some(job) = slot.current_mut(handle) else {
        return Err(CompareError::Cancelled);
    };
    if job.state.phase.is_terminal() {
        return Ok(job.state.snapshot());
    }

    match observed {
        Ok(snapshot) => {
            match job.state.apply(&snapshot) {
                Transition::Advanced => {
                    log::info!(
                        "Job {} {} at {}%",
                        handle.job_id,
                        job.state.phase,
                        job.state.progress
                    );
                    let _ = shared.events.send(TaskEvent::Progress {
                        job_id: handle.job_id.clone(),
                        snapshot: job.state.snapshot(),
                    });
                }
                Transition::Completed => {
                    log::info!("Job {} completed, retrieving result", handle.job_id);
                    let _ = shared.events.send(TaskEvent::Progress {
                        job_id: handle.job_id.clone(),
                        snapshot: job.state.snapshot(),
                    });
                }
                Transition::Failed => {
                    log::warn!("Job {} reported failure", handle.job_id);
                    let message = job.state.status_message.clone();
                    job.fail(
                        CompareError::JobFailed {
                            job_id: handle.job_id.clone(),
                            message,
                        },
                        &shared.events,
                    );
                }
                Transition::Unchanged => {}
            }
            Ok(job.state.snapshot())
        }
        Err(error) => {
            log::error!("Polling job {} failed: {}", handle.job_id, error);
            let error = match error {
                CompareError::Transport(_) => error,
                other => CompareError::Transport(other.to_string()),
            };
            job.fail(error.clone(), &shared.events);
            Err(error)
        }
    }
}

async fn retrieve(shared: &Shared, handle: &TaskHandle) {
    {
        let mut slot = shared.slot.lock();
        let Some(job) = slot.current_mut(handle) else {
            return;
        };
        if job.fetch_started {
            return;
        }
        job.fetch_started = true;
    }

    let fetched = tokio::select! {
        biased;
        _ = handle.token.cancelled() => return,
        fetched = shared.service.result(&handle.job_id) => fetched,
    };

    let mut slot = shared.slot.lock();
    let Some(job) = slot.current_mut(handle) else {
        return;
    };
    match fetched {
        Ok(rows) => {
            let row_count = rows.len();
            log::info!("Job {} returned {} rows", handle.job_id, row_count);
            job.rows = Some(rows);
            let _ = shared.events.send(TaskEvent::Completed {
                job_id: handle.job_id.clone(),
                row_count,
            });
        }
        Err(error) => {
            log::error!("Retrieving result of job {} failed: {}", handle.job_id, error);
            job.fail(error, &shared.events);
        }
    }
}
