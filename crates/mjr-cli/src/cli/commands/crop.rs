//! `mjr crop` – trim a media file with ffmpeg stream copy.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use mjr_core::config::MjrConfig;
use mjr_core::ffmpeg::time::parse_timestamp;
use mjr_core::jobs::CropJob;

use super::observe;

pub async fn run_crop(
    cfg: &MjrConfig,
    input: &Path,
    output: &Path,
    start: &str,
    end: Option<&str>,
) -> Result<()> {
    let start = parse_position(start)?;
    let end = end.map(parse_position).transpose()?;

    let job = CropJob::new(cfg, input, output, start, end).await?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        "crop job starting"
    );
    observe::run_to_completion(Box::new(job)).await
}

fn parse_position(s: &str) -> Result<Duration> {
    parse_timestamp(s).ok_or_else(|| anyhow!("invalid position {s:?}, expected HH:MM:SS[.mmm]"))
}
