//! Background batch jobs.
//!
//! [`BatchDriver::spawn`] runs a corpus recompute on a worker thread and hands
//! back a [`JobHandle`] for polling, cancellation and the final report. Job
//! state lives in the handle, not in a process-wide registry.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use mr_common::{Error, JobId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::{BatchOptions, BatchReport, Engine, FailedEntity};
use crate::events::{EmitterSink, JobEmitter, ProgressEmitter};

/// Lifecycle of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// Counters a poller can read while the job runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobProgress {
    /// Entities visited, including skipped and failed ones.
    pub done: usize,
    pub failed: usize,
    pub total: usize,
}

/// Cooperative cancellation flag, checked between entities.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Receives batch progress and answers cancellation checks.
///
/// Only `report_progress` is required; the other callbacks default to no-ops.
pub trait BatchProgressSink: Send + Sync {
    /// Called after every entity with the number visited so far.
    fn report_progress(&self, done: usize, total: usize);

    /// Polled before each entity. Returning true stops the batch.
    fn check_cancelled(&self) -> bool {
        false
    }

    fn report_started(&self, _job_id: &JobId, _total: usize) {}

    fn report_failure(&self, _failure: &FailedEntity) {}

    fn report_finished(&self, _report: &BatchReport) {}
}

/// Sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl BatchProgressSink for NoopSink {
    fn report_progress(&self, _done: usize, _total: usize) {}
}

impl BatchProgressSink for CancellationToken {
    fn report_progress(&self, _done: usize, _total: usize) {}

    fn check_cancelled(&self) -> bool {
        self.is_cancelled()
    }
}

/// Shared between the worker and the handle.
struct JobState {
    status: Mutex<JobStatus>,
    progress: Mutex<JobProgress>,
    cancel: CancellationToken,
    events: Option<EmitterSink>,
}

impl JobState {
    fn set_status(&self, status: JobStatus) {
        if let Ok(mut s) = self.status.lock() {
            *s = status;
        }
    }

    fn update(&self, f: impl FnOnce(&mut JobProgress)) {
        if let Ok(mut p) = self.progress.lock() {
            f(&mut p);
        }
    }
}

impl BatchProgressSink for JobState {
    fn report_progress(&self, done: usize, total: usize) {
        self.update(|p| {
            p.done = done;
            p.total = total;
        });
        if let Some(events) = &self.events {
            events.report_progress(done, total);
        }
    }

    fn check_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn report_started(&self, job_id: &JobId, total: usize) {
        self.update(|p| p.total = total);
        if let Some(events) = &self.events {
            events.report_started(job_id, total);
        }
    }

    fn report_failure(&self, failure: &FailedEntity) {
        self.update(|p| p.failed += 1);
        if let Some(events) = &self.events {
            events.report_failure(failure);
        }
    }

    fn report_finished(&self, report: &BatchReport) {
        if let Some(events) = &self.events {
            events.report_finished(report);
        }
    }
}

/// Handle to a running or finished batch job.
pub struct JobHandle {
    id: JobId,
    state: Arc<JobState>,
    worker: JoinHandle<Result<BatchReport, Error>>,
}

impl JobHandle {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.state
            .status
            .lock()
            .map(|s| *s)
            .unwrap_or(JobStatus::Failed)
    }

    pub fn progress(&self) -> JobProgress {
        self.state
            .progress
            .lock()
            .map(|p| *p)
            .unwrap_or_default()
    }

    /// Request cancellation. The worker stops before the next entity.
    pub fn cancel(&self) {
        self.state.cancel.cancel();
    }

    /// Token that cancels this job, for handing to other owners.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.state.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the worker and return its report.
    pub fn join(self) -> Result<BatchReport, Error> {
        match self.worker.join() {
            Ok(result) => result,
            Err(_) => {
                self.state.set_status(JobStatus::Failed);
                error!(job_id = %self.id, "batch worker panicked");
                Err(Error::Io(io::Error::other("batch worker panicked")))
            }
        }
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("progress", &self.progress())
            .finish()
    }
}

/// Spawns and runs corpus recomputes for one engine.
#[derive(Clone)]
pub struct BatchDriver {
    engine: Arc<Engine>,
}

impl BatchDriver {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Run a batch on the calling thread.
    pub fn run(
        &self,
        options: &BatchOptions,
        sink: &dyn BatchProgressSink,
    ) -> Result<BatchReport, Error> {
        self.engine.recompute_all(options, sink)
    }

    /// Start a batch on a worker thread.
    ///
    /// The single-flight guard is taken before the thread starts, so a
    /// concurrent batch is refused here with [`Error::BatchInProgress`]
    /// rather than inside the worker. Progress events, when an emitter is
    /// given, carry the job id.
    pub fn spawn(
        &self,
        options: BatchOptions,
        emitter: Option<Arc<dyn ProgressEmitter>>,
    ) -> Result<JobHandle, Error> {
        let guard = self.engine.begin_batch()?;

        let mut options = options;
        let id = options.job_id.get_or_insert_with(JobId::new).clone();
        let events = emitter.map(|inner| {
            let tagged: Arc<dyn ProgressEmitter> = Arc::new(JobEmitter::new(id.to_string(), inner));
            EmitterSink::new(tagged, options.progress_every)
        });
        let state = Arc::new(JobState {
            status: Mutex::new(JobStatus::Pending),
            progress: Mutex::new(JobProgress::default()),
            cancel: CancellationToken::new(),
            events,
        });

        let engine = self.engine.clone();
        let worker_state = state.clone();
        let worker = thread::Builder::new()
            .name("mr-batch".to_string())
            .spawn(move || {
                worker_state.set_status(JobStatus::Running);
                let result = engine.run_batch(guard, &options, &*worker_state);
                worker_state.set_status(match &result {
                    Ok(report) if report.cancelled => JobStatus::Cancelled,
                    Ok(_) => JobStatus::Done,
                    Err(_) => JobStatus::Failed,
                });
                result
            })?;

        Ok(JobHandle { id, state, worker })
    }
}
