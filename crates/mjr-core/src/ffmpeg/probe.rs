//! Media inspection via `ffmpeg -i <file>`.
//!
//! ffmpeg exits non-zero for a bare `-i` invocation ("at least one output
//! file must be specified"), so the exit status is ignored and only the
//! stderr lines are scanned.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;

use super::time::parse_timestamp;
use super::FfmpegDriver;

/// Broad media classification from the declared streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Unknown,
}

impl FfmpegDriver {
    /// Total duration of the file, from its `Duration:` declaration.
    pub async fn media_duration(&self, file: &Path) -> Result<Duration> {
        for line in self.info_lines(file).await? {
            // "Duration: 00:10:00.00, start: 0.000000, bitrate: 242 kb/s"
            if let Some(rest) = line.trim().strip_prefix("Duration: ") {
                let field = rest.split([',', ' ']).next().unwrap_or(rest);
                return parse_timestamp(field)
                    .with_context(|| format!("unparsable duration field {field:?}"));
            }
        }
        anyhow::bail!("no duration declared for {}", file.display())
    }

    /// Classify the file by its declared streams. A video stream wins; an
    /// audio-only file is `Audio`; no recognizable stream is `Unknown`.
    pub async fn media_kind(&self, file: &Path) -> Result<MediaKind> {
        let mut kind = MediaKind::Unknown;
        for line in self.info_lines(file).await? {
            let line = line.trim();
            if !line.starts_with("Stream #") {
                continue;
            }
            if line.contains("Video: ") {
                return Ok(MediaKind::Video);
            }
            if line.contains("Audio: ") {
                kind = MediaKind::Audio;
            }
        }
        Ok(kind)
    }

    /// Declared stream bitrate in kb/s, if any stream line carries one.
    pub async fn audio_bitrate_kbps(&self, file: &Path) -> Result<Option<u32>> {
        for line in self.info_lines(file).await? {
            let line = line.trim();
            if !line.starts_with("Stream #") {
                continue;
            }
            // "... Audio: mp3, 44100 Hz, stereo, fltp, 128 kb/s"
            if let Some(at) = line.find(" kb/s") {
                let rate = line[..at]
                    .rsplit([' ', ','])
                    .next()
                    .and_then(|tok| tok.parse::<u32>().ok());
                if rate.is_some() {
                    return Ok(rate);
                }
            }
        }
        Ok(None)
    }

    /// Run `<program> -i <file>` and return its stderr lines. Exit status is
    /// deliberately not checked.
    async fn info_lines(&self, file: &Path) -> Result<Vec<String>> {
        let output = Command::new(self.program())
            .arg("-i")
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("probe {}", file.display()))?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(stderr.lines().map(str::to_owned).collect())
    }
}
