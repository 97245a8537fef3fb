//! Typed progress updates and observer events.
//!
//! A work loop reports a [`ProgressUpdate`] listing exactly the fields it
//! wants changed; the runner applies them atomically to the shared job state
//! and forwards one [`JobEvent`] to the observer channel. Process-handle
//! attachment goes through its own typed call on the work context, never
//! through this record.

use super::status::{JobId, JobStatus};

/// A partial field update reported by a running job. Unset fields are left
/// untouched on the job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Completion percent in [0, 100]. Wall-clock-derived percents may
    /// regress; consumers treat regressions as informational.
    pub percent: Option<u8>,
    /// Human-readable time remaining, e.g. `"42s"`.
    pub eta: Option<String>,
    /// Human-readable rate, e.g. `"1.3 MiB/s"`.
    pub speed: Option<String>,
    /// Replacement display title.
    pub title: Option<String>,
}

impl ProgressUpdate {
    /// Update carrying only a percent (clamped to 100).
    pub fn percent(percent: u8) -> Self {
        Self {
            percent: Some(percent.min(100)),
            ..Self::default()
        }
    }

    pub fn with_eta(mut self, eta: impl Into<String>) -> Self {
        self.eta = Some(eta.into());
        self
    }

    pub fn with_speed(mut self, speed: impl Into<String>) -> Self {
        self.speed = Some(speed.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Notifications delivered to the observer, in emission order per job.
/// `Finished` is sent exactly once per run.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// The job's status changed (start, pause, resume).
    StatusChanged { id: JobId, status: JobStatus },
    /// A partial field update was applied.
    Progress { id: JobId, update: ProgressUpdate },
    /// The run reached a terminal status.
    Finished { id: JobId, status: JobStatus },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::StatusChanged { id, .. }
            | JobEvent::Progress { id, .. }
            | JobEvent::Finished { id, .. } => *id,
        }
    }
}
