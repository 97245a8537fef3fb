//! The work-side view of a running job: progress reporting, process
//! attachment and cooperative suspension points.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::JobError;
use crate::ffmpeg::ProcessHandle;
use crate::job::update::ProgressUpdate;

use super::shared::{JobShared, RunSignal};

/// Handed to [`Job::execute`](crate::Job::execute); every capability a work
/// loop needs from its runner. Cloneable so callbacks handed to external
/// collaborators can keep reporting.
#[derive(Clone)]
pub struct WorkContext {
    shared: Arc<JobShared>,
}

impl WorkContext {
    pub(crate) fn new(shared: Arc<JobShared>) -> Self {
        Self { shared }
    }

    /// Report a structured field update. Applied atomically to the job, then
    /// forwarded to the observer in emission order.
    pub fn report(&self, update: ProgressUpdate) {
        self.shared.apply_update(update);
    }

    /// Hand the runner a subprocess termination handle so a cancel request
    /// kills the process immediately instead of waiting for a checkpoint.
    pub fn attach_process(&self, handle: ProcessHandle) {
        self.shared.attach_process(handle);
    }

    pub fn cancel_requested(&self) -> bool {
        self.shared.cancel_requested()
    }

    /// Cooperative checkpoint: returns immediately while running, blocks
    /// (without polling) while paused, and fails with
    /// [`JobError::Canceled`] once cancellation is observed.
    pub async fn checkpoint(&self) -> Result<(), JobError> {
        let mut rx = self.shared.subscribe();
        loop {
            let sig = *rx.borrow();
            if sig.canceled {
                return Err(JobError::Canceled);
            }
            if !sig.paused {
                return Ok(());
            }
            if rx.changed().await.is_err() {
                return Err(JobError::Canceled);
            }
        }
    }

    /// Resolves once cancellation is requested; for `select!` against
    /// blocking awaits.
    pub async fn canceled(&self) {
        let mut watch = self.cancel_watch();
        watch.canceled().await;
    }

    /// Detachable cancellation signal for external collaborators (e.g. a
    /// fetch routine driving its own I/O).
    pub fn cancel_watch(&self) -> CancelWatch {
        CancelWatch {
            rx: self.shared.subscribe(),
        }
    }
}

/// Cloneable view of a job's cancellation flag.
#[derive(Debug, Clone)]
pub struct CancelWatch {
    rx: watch::Receiver<RunSignal>,
}

impl CancelWatch {
    pub fn is_canceled(&self) -> bool {
        self.rx.borrow().canceled
    }

    /// Waits until cancellation is requested. Also resolves if the job side
    /// goes away entirely, so callers can never hang on a dead run.
    pub async fn canceled(&mut self) {
        loop {
            if self.rx.borrow().canceled {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
