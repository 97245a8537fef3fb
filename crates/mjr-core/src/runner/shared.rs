//! State shared between a job's worker task and its control handles.
//!
//! The worker is the only task that drives the work loop; control handles
//! issue pause/resume/cancel requests through a watch channel observed at
//! the worker's checkpoints. Cancel additionally terminates any attached
//! subprocess handle so blocking stream reads unblock immediately.

use std::sync::Mutex;

use tokio::sync::{mpsc, watch};

use crate::ffmpeg::ProcessHandle;
use crate::job::status::{JobId, JobStatus};
use crate::job::update::{JobEvent, ProgressUpdate};
use crate::job::JobMeta;

/// Control flags observed by the worker. `started` gates queued jobs;
/// `paused` is awaited at checkpoints; `canceled` is checked everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RunSignal {
    pub started: bool,
    pub paused: bool,
    pub canceled: bool,
}

/// Point-in-time view of a job for display and assertions.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub id: JobId,
    pub title: String,
    pub status: JobStatus,
    pub percent: u8,
    pub eta: Option<String>,
    pub speed: Option<String>,
    pub meta: JobMeta,
}

#[derive(Debug)]
struct MutableState {
    meta: JobMeta,
    status: JobStatus,
    percent: u8,
    eta: Option<String>,
    speed: Option<String>,
}

#[derive(Debug)]
pub(crate) struct JobShared {
    id: JobId,
    state: Mutex<MutableState>,
    run_tx: watch::Sender<RunSignal>,
    process: Mutex<Option<ProcessHandle>>,
    events: mpsc::UnboundedSender<JobEvent>,
}

impl JobShared {
    pub(crate) fn new(
        id: JobId,
        meta: JobMeta,
        started: bool,
        events: mpsc::UnboundedSender<JobEvent>,
    ) -> Self {
        let (run_tx, _) = watch::channel(RunSignal {
            started,
            ..RunSignal::default()
        });
        Self {
            id,
            state: Mutex::new(MutableState {
                meta,
                status: JobStatus::Queued,
                percent: 0,
                eta: None,
                speed: None,
            }),
            run_tx,
            process: Mutex::new(None),
            events,
        }
    }

    pub(crate) fn id(&self) -> JobId {
        self.id
    }

    pub(crate) fn status(&self) -> JobStatus {
        self.state.lock().unwrap().status
    }

    pub(crate) fn snapshot(&self) -> JobSnapshot {
        let s = self.state.lock().unwrap();
        JobSnapshot {
            id: self.id,
            title: s.meta.title.clone(),
            status: s.status,
            percent: s.percent,
            eta: s.eta.clone(),
            speed: s.speed.clone(),
            meta: s.meta.clone(),
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<RunSignal> {
        self.run_tx.subscribe()
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        self.run_tx.borrow().canceled
    }

    /// Whether a pause request would be honored right now: the job must be
    /// Working and its work loop must actually be able to suspend.
    pub(crate) fn pause_allowed(&self) -> bool {
        let s = self.state.lock().unwrap();
        s.status.can_pause() && s.meta.supports_pause
    }

    /// Pause request: no-op `false` unless currently Working and the job
    /// declares pause support.
    pub(crate) fn request_pause(&self) -> bool {
        {
            let mut s = self.state.lock().unwrap();
            if !s.status.can_pause() || !s.meta.supports_pause {
                return false;
            }
            s.status = JobStatus::Paused;
        }
        self.run_tx.send_modify(|sig| sig.paused = true);
        self.emit(JobEvent::StatusChanged {
            id: self.id,
            status: JobStatus::Paused,
        });
        true
    }

    /// Resume request: un-pauses a Paused job or starts a Queued one.
    pub(crate) fn request_resume(&self) -> bool {
        {
            let mut s = self.state.lock().unwrap();
            if !s.status.can_resume() {
                return false;
            }
            s.status = JobStatus::Working;
        }
        self.run_tx.send_modify(|sig| {
            sig.paused = false;
            sig.started = true;
        });
        self.emit(JobEvent::StatusChanged {
            id: self.id,
            status: JobStatus::Working,
        });
        true
    }

    /// Cancel request: accepted from any non-terminal state. The terminal
    /// Canceled status is set by the worker once the flag is observed; an
    /// attached subprocess is terminated right away.
    pub(crate) fn request_cancel(&self) -> bool {
        if !self.status().can_stop() {
            return false;
        }
        self.run_tx.send_modify(|sig| {
            sig.canceled = true;
            // A paused worker must wake to observe the flag.
            sig.paused = false;
        });
        if let Some(handle) = self.process.lock().unwrap().take() {
            handle.terminate();
        }
        true
    }

    /// Worker entry: Queued -> Working, once, before the work loop runs.
    pub(crate) fn mark_working(&self) {
        {
            let mut s = self.state.lock().unwrap();
            if s.status != JobStatus::Queued {
                return;
            }
            s.status = JobStatus::Working;
        }
        self.emit(JobEvent::StatusChanged {
            id: self.id,
            status: JobStatus::Working,
        });
    }

    /// Apply a field update atomically, then notify the observer.
    pub(crate) fn apply_update(&self, update: ProgressUpdate) {
        if update.is_empty() {
            return;
        }
        {
            let mut s = self.state.lock().unwrap();
            if let Some(p) = update.percent {
                s.percent = p.min(100);
            }
            if let Some(ref eta) = update.eta {
                s.eta = Some(eta.clone());
            }
            if let Some(ref speed) = update.speed {
                s.speed = Some(speed.clone());
            }
            if let Some(ref title) = update.title {
                s.meta.title = title.clone();
            }
        }
        self.emit(JobEvent::Progress {
            id: self.id,
            update,
        });
    }

    /// Retain the subprocess termination handle for the rest of the run.
    /// If cancellation already happened, terminate immediately instead.
    pub(crate) fn attach_process(&self, handle: ProcessHandle) {
        *self.process.lock().unwrap() = Some(handle);
        // Store first, then re-check: a cancel that raced this attach and
        // found the slot empty still gets its process killed, because the
        // flag it set is visible here.
        if self.cancel_requested() {
            if let Some(handle) = self.process.lock().unwrap().take() {
                handle.terminate();
            }
        }
    }

    pub(crate) fn clear_process(&self) {
        self.process.lock().unwrap().take();
    }

    /// Worker exit: set the terminal status, sync final metadata from the
    /// job, and emit the single terminal notification.
    pub(crate) fn finish(&self, status: JobStatus, final_meta: &JobMeta) {
        {
            let mut s = self.state.lock().unwrap();
            s.meta = final_meta.clone();
            s.status = status;
            if status == JobStatus::Succeeded {
                s.percent = 100;
            }
        }
        self.emit(JobEvent::Finished {
            id: self.id,
            status,
        });
    }

    fn emit(&self, event: JobEvent) {
        // The observer may have gone away (receiver dropped); that is fine.
        let _ = self.events.send(event);
    }
}
