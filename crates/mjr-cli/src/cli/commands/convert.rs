//! `mjr convert` – extract or transcode a file's audio to MP3.

use std::path::Path;

use anyhow::Result;
use mjr_core::config::MjrConfig;
use mjr_core::jobs::ConvertJob;

use super::observe;

pub async fn run_convert(cfg: &MjrConfig, input: &Path, output: &Path) -> Result<()> {
    let job = ConvertJob::new(cfg, input, output).await?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        "convert job starting"
    );
    observe::run_to_completion(Box::new(job)).await
}
