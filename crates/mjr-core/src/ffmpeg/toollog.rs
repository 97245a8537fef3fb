//! Append-only diagnostics log for external tool runs.
//!
//! One file per logical channel (e.g. `ffmpeg-crop.log`). Each run writes a
//! timestamped header with the invoked command line, every raw output line
//! verbatim, and a trailing separator. The engine only writes here; nothing
//! reads it back.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Default tool-log directory: `~/.local/state/mjr/logs`.
pub fn default_log_dir() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("mjr")?;
    Ok(dirs.get_state_home().join("logs"))
}

/// Writer for one channel of the diagnostics sink.
#[derive(Debug)]
pub struct ToolLog {
    file: fs::File,
    path: PathBuf,
}

impl ToolLog {
    /// Open (append) the log file for `channel` under `dir`, creating the
    /// directory as needed.
    pub fn open(dir: &Path, channel: &str) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("create tool log dir {}", dir.display()))?;
        let path = dir.join(format!("{channel}.log"));
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open tool log {}", path.display()))?;
        Ok(Self { file, path })
    }

    /// Write the per-run header: timestamp and invoked command line.
    pub fn header(&mut self, command_line: &str) {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        self.write(&format!("[{now}]\ncmd: {command_line}\n\nOUTPUT\n"));
    }

    /// Write one raw output line verbatim.
    pub fn line(&mut self, raw: &str) {
        self.write(raw);
        self.write("\n");
    }

    /// Write the trailing separator for this run.
    pub fn footer(&mut self) {
        self.write("\n\n");
    }

    /// Sink writes must never fail the run; a broken log is reported once
    /// per write at debug level and otherwise ignored.
    fn write(&mut self, s: &str) {
        if let Err(e) = self.file.write_all(s.as_bytes()) {
            tracing::debug!(path = %self.path.display(), "tool log write failed: {e}");
        }
    }
}
