//! External process driver for ffmpeg (and ffmpeg-shaped tools in tests).
//!
//! The driver is the only component that touches process lifecycle: it
//! launches the tool with redirected output and no shell, streams its
//! diagnostic lines through the [`ProgressParser`], mirrors every raw line to
//! the [`ToolLog`] sink, and exposes a termination handle that unblocks the
//! stream read by killing the exclusively owned child.

pub mod parser;
pub mod probe;
pub mod time;
pub mod toollog;

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Notify;

use crate::config::MjrConfig;

pub use parser::{ParserEvent, ProgressParser};
pub use probe::MediaKind;
pub use toollog::ToolLog;

/// Termination handle for one owned subprocess. Cloneable so the runner can
/// retain it for cancellation while the job drives the run.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    kill: Arc<Notify>,
}

impl ProcessHandle {
    /// Request immediate termination. Safe to call any number of times, from
    /// any task; the owning read loop kills the child on its next tick,
    /// which ends the stream with EOF.
    pub fn terminate(&self) {
        self.kill.notify_one();
    }
}

/// Launches media-processing subprocesses.
#[derive(Debug, Clone)]
pub struct FfmpegDriver {
    program: PathBuf,
    log_dir: PathBuf,
}

impl FfmpegDriver {
    pub fn new(program: PathBuf, log_dir: PathBuf) -> Self {
        Self { program, log_dir }
    }

    pub fn from_config(cfg: &MjrConfig) -> Result<Self> {
        Ok(Self::new(cfg.ffmpeg_path.clone(), cfg.tool_log_dir()?))
    }

    pub(crate) fn program(&self) -> &std::path::Path {
        &self.program
    }

    /// Spawn the tool with `args` (no shell interpretation) and begin
    /// streaming its stderr. `channel` names the diagnostics log;
    /// `known_total` is the caller-known percent denominator, if any.
    pub fn spawn(
        &self,
        args: &[String],
        channel: &str,
        known_total: Option<Duration>,
    ) -> Result<FfmpegRun> {
        let mut log = ToolLog::open(&self.log_dir, channel)?;
        log.header(&format!(
            "{} {}",
            self.program.display(),
            args.join(" ")
        ));

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawn {}", self.program.display()))?;

        let stderr = child
            .stderr
            .take()
            .context("child stderr was not captured")?;

        tracing::debug!(program = %self.program.display(), channel, "subprocess started");

        Ok(FfmpegRun {
            tool: self.program.display().to_string(),
            child,
            lines: BufReader::new(stderr).lines(),
            parser: ProgressParser::new(known_total),
            log,
            kill: Arc::new(Notify::new()),
            killed: false,
            finished_seen: false,
        })
    }
}

/// Exit summary for one subprocess run.
#[derive(Debug, Clone, Copy)]
pub struct FfmpegExit {
    /// Process exited with status zero.
    pub success: bool,
    /// Raw exit code, when the platform reports one.
    pub code: Option<i32>,
    /// We terminated the process (cancellation), so a bad status is expected.
    pub killed: bool,
    /// The stream reached its blank-line terminator before EOF. When this is
    /// false but `success` is true, the caller still treats the run as
    /// complete (percent 100).
    pub finished_marker_seen: bool,
}

/// One in-flight subprocess: owned child plus its line stream and parser.
pub struct FfmpegRun {
    tool: String,
    child: Child,
    lines: Lines<BufReader<ChildStderr>>,
    parser: ProgressParser,
    log: ToolLog,
    kill: Arc<Notify>,
    killed: bool,
    finished_seen: bool,
}

impl FfmpegRun {
    /// Handle the runner retains so cancellation can kill the child without
    /// waiting for a cooperative checkpoint.
    pub fn handle(&self) -> ProcessHandle {
        ProcessHandle {
            kill: Arc::clone(&self.kill),
        }
    }

    /// Next normalized progress event, or `None` at end of stream. Every raw
    /// line is mirrored to the diagnostics sink whether or not it parses.
    /// A `terminate()` on the handle kills the child mid-read; the read then
    /// ends with EOF on its own.
    pub async fn next_event(&mut self) -> Option<ParserEvent> {
        loop {
            let kill = Arc::clone(&self.kill);
            let killed = self.killed;
            // `None` marks a termination request, `Some` a read result.
            let read = tokio::select! {
                _ = kill.notified(), if !killed => None,
                line = self.lines.next_line() => Some(line),
            };
            match read {
                None => {
                    self.killed = true;
                    if let Err(e) = self.child.start_kill() {
                        tracing::warn!(tool = %self.tool, "kill failed: {e}");
                    }
                }
                Some(Ok(Some(line))) => {
                    self.log.line(&line);
                    if let Some(event) = self.parser.push_line(&line) {
                        if event == ParserEvent::Finished {
                            self.finished_seen = true;
                        }
                        return Some(event);
                    }
                }
                Some(Ok(None)) => return None,
                Some(Err(e)) => {
                    tracing::debug!(tool = %self.tool, "stream read ended: {e}");
                    return None;
                }
            }
        }
    }

    /// Drain any remaining output, reap the child and close out the log.
    /// Process exit is terminal even when no blank-line terminator was seen.
    pub async fn wait(mut self) -> Result<FfmpegExit> {
        while self.next_event().await.is_some() {}
        let status = self
            .child
            .wait()
            .await
            .with_context(|| format!("wait for {}", self.tool))?;
        self.log.footer();
        tracing::debug!(tool = %self.tool, killed = self.killed, ?status, "subprocess exited");
        Ok(FfmpegExit {
            success: status.success(),
            code: status.code(),
            killed: self.killed,
            finished_marker_seen: self.finished_seen,
        })
    }
}
