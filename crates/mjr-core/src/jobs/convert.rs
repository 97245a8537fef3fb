//! Convert job: extract/transcode a file's audio to MP3 with ffmpeg.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::MjrConfig;
use crate::error::JobError;
use crate::ffmpeg::{FfmpegDriver, ParserEvent};
use crate::job::{Job, JobMeta, ProgressUpdate};
use crate::runner::WorkContext;

const LOG_CHANNEL: &str = "ffmpeg-convert";

/// Transcode one input file to MP3, keeping the source's audio bitrate when
/// it declares one.
pub struct ConvertJob {
    meta: JobMeta,
    driver: FfmpegDriver,
    input: PathBuf,
    bitrate_kbps: u32,
}

impl ConvertJob {
    pub async fn new(
        cfg: &MjrConfig,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Result<Self> {
        let input = input.into();
        let output = output.into();
        if input == output {
            return Err(JobError::InvalidInput("input and output are the same file".into()).into());
        }

        let driver = FfmpegDriver::from_config(cfg)?;
        let bitrate_kbps = driver
            .audio_bitrate_kbps(&input)
            .await
            .unwrap_or_default()
            .unwrap_or(cfg.convert_bitrate_kbps);
        let duration = driver.media_duration(&input).await.ok();

        let title = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| output.display().to_string());

        Ok(Self {
            meta: JobMeta {
                title,
                source: input.display().to_string(),
                destination: output,
                duration,
                size: None,
                thumbnail: None,
                reports_progress: true,
                supports_pause: false,
            },
            driver,
            input,
            bitrate_kbps,
        })
    }

    /// `-y -i <input> -vn -f mp3 -ab <N>k <output>`
    fn build_args(&self) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            self.input.display().to_string(),
            "-vn".to_string(),
            "-f".to_string(),
            "mp3".to_string(),
            "-ab".to_string(),
            format!("{}k", self.bitrate_kbps),
            self.meta.destination.display().to_string(),
        ]
    }
}

#[async_trait]
impl Job for ConvertJob {
    fn meta(&self) -> &JobMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut JobMeta {
        &mut self.meta
    }

    async fn execute(&mut self, ctx: &WorkContext) -> Result<()> {
        // Percent denominator comes from the stream's own Duration line.
        let args = self.build_args();
        let mut run = self.driver.spawn(&args, LOG_CHANNEL, None)?;
        ctx.attach_process(run.handle());

        let mut finished = false;
        while let Some(event) = run.next_event().await {
            match event {
                ParserEvent::Started => ctx.report(ProgressUpdate::percent(0)),
                ParserEvent::Progress(p) => ctx.report(ProgressUpdate::percent(p)),
                ParserEvent::Finished => {
                    finished = true;
                    ctx.report(ProgressUpdate::percent(100));
                }
            }
        }

        let exit = run.wait().await?;
        if exit.killed || ctx.cancel_requested() {
            return Err(JobError::Canceled.into());
        }
        if !exit.success {
            return Err(JobError::Subprocess {
                tool: "ffmpeg".into(),
                code: exit.code,
            }
            .into());
        }
        if !finished {
            ctx.report(ProgressUpdate::percent(100));
        }
        Ok(())
    }

    async fn completed(&mut self) -> Result<()> {
        let dest = self.meta.destination.clone();
        let len = tokio::fs::metadata(&dest)
            .await
            .with_context(|| format!("stat {}", dest.display()))?
            .len();
        self.meta.size = Some(len);
        Ok(())
    }
}
