//! Crop job: trim a media file with ffmpeg stream copy.
//!
//! The source duration is probed up front so the progress denominator is
//! known before ffmpeg starts. The subprocess handle is attached to the
//! runner so a cancel request kills ffmpeg immediately instead of waiting
//! for a checkpoint.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::MjrConfig;
use crate::error::JobError;
use crate::ffmpeg::{FfmpegDriver, MediaKind, ParserEvent};
use crate::job::{Job, JobMeta, ProgressUpdate};
use crate::runner::WorkContext;

const LOG_CHANNEL: &str = "ffmpeg-crop";

/// Time-bounded or open-ended trim of one input file.
pub struct CropJob {
    meta: JobMeta,
    driver: FfmpegDriver,
    input: PathBuf,
    start: Duration,
    end: Option<Duration>,
}

impl CropJob {
    /// Probes the input duration before returning, so a crop job always
    /// declares its media length. `end = None` crops to the end of input.
    pub async fn new(
        cfg: &MjrConfig,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        start: Duration,
        end: Option<Duration>,
    ) -> Result<Self> {
        let input = input.into();
        let output = output.into();
        if input == output {
            return Err(JobError::InvalidInput("input and output are the same file".into()).into());
        }

        let driver = FfmpegDriver::from_config(cfg)?;
        let duration = driver
            .media_duration(&input)
            .await
            .with_context(|| format!("probe duration of {}", input.display()))?;

        let title = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| output.display().to_string());

        Ok(Self {
            meta: JobMeta {
                title,
                source: input.display().to_string(),
                destination: output,
                duration: Some(duration),
                size: None,
                thumbnail: None,
                reports_progress: true,
                supports_pause: false,
            },
            driver,
            input,
            start,
            end,
        })
    }

    /// ffmpeg arguments: `-y -ss <start> -i <input> [-to <len>] -acodec copy
    /// [-vcodec copy] <output>`. Video copy only applies to video inputs.
    fn build_args(&self, kind: MediaKind) -> Vec<String> {
        use crate::ffmpeg::time::format_timestamp;

        let mut args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            format_timestamp(self.start),
            "-i".to_string(),
            self.input.display().to_string(),
        ];
        if let Some(end) = self.end {
            let len = abs_diff(self.start, end);
            args.push("-to".to_string());
            args.push(format_timestamp(len));
        }
        args.push("-acodec".to_string());
        args.push("copy".to_string());
        if kind == MediaKind::Video {
            args.push("-vcodec".to_string());
            args.push("copy".to_string());
        }
        args.push(self.meta.destination.display().to_string());
        args
    }
}

#[async_trait]
impl Job for CropJob {
    fn meta(&self) -> &JobMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut JobMeta {
        &mut self.meta
    }

    async fn execute(&mut self, ctx: &WorkContext) -> Result<()> {
        let kind = self.driver.media_kind(&self.input).await.unwrap_or_else(|e| {
            tracing::debug!(input = %self.input.display(), "stream probe failed: {e:#}");
            MediaKind::Unknown
        });

        // For a bounded crop the caller-known end position is the percent
        // denominator (inherited behavior); open-ended crops use the
        // duration declared in the stream itself.
        let known_total = self.end;
        let args = self.build_args(kind);
        let mut run = self.driver.spawn(&args, LOG_CHANNEL, known_total)?;
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
            // Successful exit without the blank-line terminator still means
            // the encode completed.
            ctx.report(ProgressUpdate::percent(100));
        }
        Ok(())
    }

    async fn completed(&mut self) -> Result<()> {
        // Re-measure what was actually written.
        let dest = self.meta.destination.clone();
        self.meta.duration = Some(self.driver.media_duration(&dest).await?);
        let len = tokio::fs::metadata(&dest)
            .await
            .with_context(|| format!("stat {}", dest.display()))?
            .len();
        self.meta.size = Some(len);
        Ok(())
    }
}

fn abs_diff(a: Duration, b: Duration) -> Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}
