//! Logging init: file under the XDG state dir, or graceful fallback to
//! stderr when the log directory is unwritable.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,mjr_core=debug,mjr_cli=debug";

/// Per-event writer: the cloned log file, or stderr if cloning fails.
enum LogTarget {
    File(fs::File),
    Stderr,
}

impl io::Write for LogTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogTarget::File(f) => f.write(buf),
            LogTarget::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogTarget::File(f) => f.flush(),
            LogTarget::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct FileWriter(fs::File);

impl<'a> MakeWriter<'a> for FileWriter {
    type Writer = LogTarget;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(LogTarget::File)
            .unwrap_or(LogTarget::Stderr)
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize structured logging to `~/.local/state/mjr/mjr.log`. Returns
/// Err when the file cannot be opened so the caller can fall back to
/// [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mjr")?;
    let log_dir = xdg_dirs.get_state_home();
    fs::create_dir_all(&log_dir)?;
    let log_path: PathBuf = log_dir.join("mjr.log");

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(BoxMakeWriter::new(FileWriter(file)))
        .with_ansi(false)
        .init();

    tracing::info!("mjr logging initialized at {}", log_path.display());
    Ok(())
}

/// Stderr-only logging, used when file logging is unavailable.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}
