//! The job runner: one worker task per job, thread-safe control requests,
//! ordered observer notifications and the error-taxonomy boundary.
//!
//! All raw faults and parse anomalies are absorbed here; the observer sees
//! only progress updates, status changes and exactly one terminal event per
//! job. `start`/`pause`/`resume`/`cancel` never raise.

mod context;
mod shared;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::JobError;
use crate::faults::{FaultReporter, LogFaultReporter};
use crate::fsutil;
use crate::job::status::{JobId, JobStatus};
use crate::job::update::JobEvent;
use crate::job::Job;

use shared::JobShared;

pub use context::{CancelWatch, WorkContext};
pub use shared::JobSnapshot;

/// Suffix appended to a failed job's title so listings can tell it apart.
const FAILED_TITLE_SUFFIX: &str = " ERROR";

/// Spawns and supervises job workers. Observer notifications from all jobs
/// arrive on the single receiver returned by [`JobRunner::new`]; per-job
/// ordering matches emission order.
pub struct JobRunner {
    events: mpsc::UnboundedSender<JobEvent>,
    reporter: Arc<dyn FaultReporter>,
    next_id: AtomicU64,
}

impl JobRunner {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        Self::with_reporter(Arc::new(LogFaultReporter))
    }

    pub fn with_reporter(
        reporter: Arc<dyn FaultReporter>,
    ) -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                events,
                reporter,
                next_id: AtomicU64::new(1),
            },
            rx,
        )
    }

    /// Begin executing the job immediately. Returns without blocking; the
    /// work runs on its own task.
    pub fn start(&self, job: Box<dyn Job>) -> JobHandle {
        self.spawn(job, true)
    }

    /// Register the job in Queued state. It starts when `resume()` is called
    /// on its handle (the shared resume entry point).
    pub fn enqueue(&self, job: Box<dyn Job>) -> JobHandle {
        self.spawn(job, false)
    }

    fn spawn(&self, job: Box<dyn Job>, started: bool) -> JobHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(JobShared::new(
            id,
            job.meta().clone(),
            started,
            self.events.clone(),
        ));
        let controller = JobController {
            shared: Arc::clone(&shared),
        };
        let reporter = Arc::clone(&self.reporter);
        let task = tokio::spawn(run_job(job, shared, reporter));
        JobHandle { controller, task }
    }
}

/// Cloneable control surface for one job: capability-gated requests and
/// state queries. Requests outside their allowed state are no-ops returning
/// `false`.
#[derive(Clone)]
pub struct JobController {
    shared: Arc<JobShared>,
}

impl JobController {
    pub fn id(&self) -> JobId {
        self.shared.id()
    }

    pub fn status(&self) -> JobStatus {
        self.shared.status()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.shared.snapshot()
    }

    pub fn can_pause(&self) -> bool {
        self.shared.pause_allowed()
    }

    pub fn can_resume(&self) -> bool {
        self.status().can_resume()
    }

    pub fn can_stop(&self) -> bool {
        self.status().can_stop()
    }

    /// Request a pause; honored at the worker's next checkpoint.
    pub fn pause(&self) -> bool {
        self.shared.request_pause()
    }

    /// Resume a paused job, or start a queued one.
    pub fn resume(&self) -> bool {
        self.shared.request_resume()
    }

    /// Request cancellation. Cooperative for in-memory loops; immediate for
    /// an attached subprocess, which is terminated right away.
    pub fn cancel(&self) -> bool {
        self.shared.request_cancel()
    }
}

/// Owner handle for one spawned job: the controller plus the worker task.
pub struct JobHandle {
    controller: JobController,
    task: JoinHandle<()>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.controller.id()
    }

    pub fn status(&self) -> JobStatus {
        self.controller.status()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.controller.snapshot()
    }

    pub fn pause(&self) -> bool {
        self.controller.pause()
    }

    pub fn resume(&self) -> bool {
        self.controller.resume()
    }

    pub fn cancel(&self) -> bool {
        self.controller.cancel()
    }

    /// Detached control surface (e.g. for a signal handler).
    pub fn controller(&self) -> JobController {
        self.controller.clone()
    }

    /// Wait for the run to end and return the terminal status.
    pub async fn wait(self) -> JobStatus {
        // The worker never panics by contract; if it somehow does, the
        // status below still reflects the last state it reached.
        let _ = self.task.await;
        self.controller.status()
    }
}

/// Worker body: gate on start, run the work function once, map the outcome
/// through the error taxonomy, clean up and notify exactly once.
async fn run_job(mut job: Box<dyn Job>, shared: Arc<JobShared>, reporter: Arc<dyn FaultReporter>) {
    if !wait_for_start(&shared).await {
        // Canceled while still queued; nothing ran, nothing to clean up.
        shared.finish(JobStatus::Canceled, job.meta());
        return;
    }
    shared.mark_working();

    let ctx = WorkContext::new(Arc::clone(&shared));
    let result = job.execute(&ctx).await;
    shared.clear_process();

    let status = match result {
        Ok(()) if shared.cancel_requested() => JobStatus::Canceled,
        Ok(()) => JobStatus::Succeeded,
        Err(err) if JobError::is_canceled(&err) => JobStatus::Canceled,
        Err(err) => {
            reporter.report(&job.meta().title, &err);
            let title = &mut job.meta_mut().title;
            if !title.ends_with(FAILED_TITLE_SUFFIX) {
                title.push_str(FAILED_TITLE_SUFFIX);
            }
            JobStatus::Failed
        }
    };

    match status {
        JobStatus::Succeeded => {
            if let Err(err) = job.completed().await {
                tracing::warn!(job = %job.meta().title, "completion work failed: {:#}", err);
            }
        }
        _ => {
            // Never leave a partial artifact behind on Failed or Canceled.
            let destination = job.meta().destination.clone();
            if let Err(err) = fsutil::remove_file_if_exists(&destination) {
                tracing::warn!(
                    path = %destination.display(),
                    "could not remove partial output: {err}"
                );
            }
        }
    }

    shared.finish(status, job.meta());
}

/// Block until a queued job is started (resume) or canceled. Returns `false`
/// when canceled before ever starting.
async fn wait_for_start(shared: &JobShared) -> bool {
    let mut rx = shared.subscribe();
    loop {
        let sig = *rx.borrow();
        if sig.canceled {
            return false;
        }
        if sig.started {
            return true;
        }
        if rx.changed().await.is_err() {
            return false;
        }
    }
}
