//! The [`Job`] abstraction: declared metadata plus a single async work entry
//! point, polymorphic over the concrete job kind (crop, download, simulated).

pub mod status;
pub mod update;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::runner::WorkContext;

pub use status::{JobId, JobStatus};
pub use update::{JobEvent, ProgressUpdate};

/// Declared metadata for a job. The runner copies this into the shared job
/// state when the job is spawned; `duration`/`size` may be re-measured by
/// the job's completion hook.
#[derive(Debug, Clone, Default)]
pub struct JobMeta {
    /// Display title, e.g. the output file name.
    pub title: String,
    /// Source locator: URL or input path.
    pub source: String,
    /// Destination path. Two concurrently active jobs must not target the
    /// same destination; enforcing that is the caller's responsibility.
    pub destination: PathBuf,
    /// Declared total duration of the media, if known.
    pub duration: Option<Duration>,
    /// Declared total size in bytes, if known.
    pub size: Option<u64>,
    /// Optional thumbnail reference for display.
    pub thumbnail: Option<String>,
    /// Whether this job emits progress updates at all.
    pub reports_progress: bool,
    /// Whether the work loop can actually suspend at a checkpoint. False for
    /// subprocess-backed jobs: ffmpeg keeps encoding regardless, so a pause
    /// would be a lie and progress would keep moving.
    pub supports_pause: bool,
}

/// A unit of long-running, cancellable work.
///
/// `execute` runs on a dedicated worker task. It reports progress through the
/// [`WorkContext`], honors pause/cancel at its checkpoints, and surfaces an
/// observed cancellation as [`crate::JobError::Canceled`]. Any other error is
/// absorbed by the runner and mapped to `Failed`.
#[async_trait]
pub trait Job: Send {
    fn meta(&self) -> &JobMeta;

    fn meta_mut(&mut self) -> &mut JobMeta;

    /// The work function. Runs exactly once per job.
    async fn execute(&mut self, ctx: &WorkContext) -> Result<()>;

    /// Post-success hook, e.g. re-measuring the output file. Errors here are
    /// logged and do not change the terminal status.
    async fn completed(&mut self) -> Result<()> {
        Ok(())
    }
}
