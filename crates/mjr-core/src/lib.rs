//! MJR core: an asynchronous engine for long-running, cancellable, pausable
//! media jobs (download, crop, convert), with normalized progress parsed
//! from ffmpeg's diagnostic stream.

pub mod config;
pub mod logging;

pub mod error;
pub mod faults;
pub mod ffmpeg;
pub mod fsutil;
pub mod job;
pub mod jobs;
pub mod runner;

pub use config::MjrConfig;
pub use error::JobError;
pub use faults::{FaultReporter, LogFaultReporter};
pub use job::{Job, JobEvent, JobId, JobMeta, JobStatus, ProgressUpdate};
pub use runner::{JobController, JobHandle, JobRunner, JobSnapshot, WorkContext};
