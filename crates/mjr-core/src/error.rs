//! Job error classification.
//!
//! Work loops return `anyhow::Error`; the runner downcasts to [`JobError`]
//! to map cancellation and subprocess failures to the right terminal status
//! before anything reaches the observer.

use thiserror::Error;

/// Errors a job work loop can surface to the runner boundary.
#[derive(Debug, Error)]
pub enum JobError {
    /// Cancellation was observed at a checkpoint or via process termination.
    #[error("job canceled")]
    Canceled,

    /// The external tool exited non-zero (and was not killed by us).
    #[error("{tool} exited with status {}", .code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    Subprocess { tool: String, code: Option<i32> },

    /// The job was constructed with unusable inputs (e.g. input == output).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl JobError {
    /// True if `err` is (or wraps) an observed cancellation.
    pub fn is_canceled(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<JobError>(), Some(JobError::Canceled))
    }
}
