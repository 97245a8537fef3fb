//! Job state machine: statuses, legal transitions, capability queries.
//!
//! Every job variant shares this table. Requests made outside the allowed
//! state are no-ops that return `false`; nothing here panics or errors.

/// Job identifier, assigned by the runner when a job is spawned.
pub type JobId = u64;

/// Run state of a job. `Canceled`, `Failed` and `Succeeded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Working,
    Paused,
    Canceled,
    Failed,
    Succeeded,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Working => "working",
            JobStatus::Paused => "paused",
            JobStatus::Canceled => "canceled",
            JobStatus::Failed => "failed",
            JobStatus::Succeeded => "succeeded",
        }
    }

    /// No further transitions are possible from a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Canceled | JobStatus::Failed | JobStatus::Succeeded
        )
    }

    /// A pause request is honored only while the job is actually working.
    pub fn can_pause(self) -> bool {
        self == JobStatus::Working
    }

    /// Resume covers both un-pausing and starting a queued job.
    pub fn can_resume(self) -> bool {
        matches!(self, JobStatus::Paused | JobStatus::Queued)
    }

    /// A stop (cancel) request is accepted from any non-terminal state.
    pub fn can_stop(self) -> bool {
        matches!(
            self,
            JobStatus::Working | JobStatus::Paused | JobStatus::Queued
        )
    }

    /// The result file can be opened only after a successful run.
    pub fn can_open(self) -> bool {
        self == JobStatus::Succeeded
    }

    /// Whether `self -> next` is a legal edge of the state machine.
    pub fn allows(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Queued, Working) => true,
            (Working, Paused) => true,
            (Paused, Working) => true,
            (Queued | Working | Paused, Canceled) => true,
            (Working, Succeeded | Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
