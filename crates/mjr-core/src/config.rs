//! Engine configuration loaded from `~/.config/mjr/config.toml`.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::ffmpeg::toollog;

/// Global configuration for the job engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MjrConfig {
    /// Path to the ffmpeg executable (resolved via PATH when bare).
    pub ffmpeg_path: PathBuf,
    /// Fallback audio bitrate in kb/s for conversions whose source declares
    /// none.
    pub convert_bitrate_kbps: u32,
    /// Checkpoint tick for in-memory work loops, in milliseconds.
    pub work_tick_ms: u64,
    /// Override for the tool diagnostics log directory (default: XDG state
    /// dir `mjr/logs`).
    #[serde(default)]
    pub tool_log_dir: Option<PathBuf>,
}

impl Default for MjrConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            convert_bitrate_kbps: 192,
            work_tick_ms: 100,
            tool_log_dir: None,
        }
    }
}

impl MjrConfig {
    /// Directory for the per-channel tool logs.
    pub fn tool_log_dir(&self) -> Result<PathBuf> {
        match &self.tool_log_dir {
            Some(dir) => Ok(dir.clone()),
            None => toollog::default_log_dir(),
        }
    }

    pub fn work_tick(&self) -> Duration {
        Duration::from_millis(self.work_tick_ms.max(1))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mjr")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MjrConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MjrConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: MjrConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = MjrConfig::default();
        assert_eq!(cfg.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(cfg.convert_bitrate_kbps, 192);
        assert_eq!(cfg.work_tick(), Duration::from_millis(100));
        assert!(cfg.tool_log_dir.is_none());
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = MjrConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: MjrConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.ffmpeg_path, cfg.ffmpeg_path);
        assert_eq!(parsed.convert_bitrate_kbps, cfg.convert_bitrate_kbps);
        assert_eq!(parsed.work_tick_ms, cfg.work_tick_ms);
    }

    #[test]
    fn custom_values_and_log_dir_override() {
        let toml = r#"
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            convert_bitrate_kbps = 128
            work_tick_ms = 50
            tool_log_dir = "/tmp/mjr-logs"
        "#;
        let cfg: MjrConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(cfg.convert_bitrate_kbps, 128);
        assert_eq!(cfg.work_tick(), Duration::from_millis(50));
        assert_eq!(cfg.tool_log_dir().unwrap(), PathBuf::from("/tmp/mjr-logs"));
    }

    #[test]
    fn zero_tick_is_clamped() {
        let toml = r#"
            ffmpeg_path = "ffmpeg"
            convert_bitrate_kbps = 192
            work_tick_ms = 0
        "#;
        let cfg: MjrConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.work_tick(), Duration::from_millis(1));
    }
}
