//! CLI for the MJR media job engine.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mjr_core::config;

use commands::{run_convert, run_crop, run_simulate};

/// Top-level CLI for the MJR media job engine.
#[derive(Debug, Parser)]
#[command(name = "mjr")]
#[command(about = "MJR: cancellable, pausable media jobs on ffmpeg", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Trim a media file with stream copy.
    Crop {
        /// Input media file.
        input: PathBuf,
        /// Output media file (overwritten if present).
        output: PathBuf,
        /// Crop start position as HH:MM:SS[.mmm].
        #[arg(long, default_value = "00:00:00")]
        start: String,
        /// Crop end position as HH:MM:SS[.mmm]; omit to crop to end of input.
        #[arg(long)]
        end: Option<String>,
    },

    /// Extract or transcode a file's audio to MP3.
    Convert {
        /// Input media file.
        input: PathBuf,
        /// Output MP3 file (overwritten if present).
        output: PathBuf,
    },

    /// Run a simulated in-memory job (for trying out pause/cancel plumbing).
    Simulate {
        /// Simulated work time in milliseconds.
        #[arg(long, default_value = "5000", value_name = "MS")]
        duration_ms: u64,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Crop {
                input,
                output,
                start,
                end,
            } => run_crop(&cfg, &input, &output, &start, end.as_deref()).await?,
            CliCommand::Convert { input, output } => run_convert(&cfg, &input, &output).await?,
            CliCommand::Simulate { duration_ms } => run_simulate(&cfg, duration_ms).await?,
        }

        Ok(())
    }
}
