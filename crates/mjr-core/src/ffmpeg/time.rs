//! Timestamp codec for ffmpeg's `HH:MM:SS.ff` stream fields and the
//! `HH:MM:SS.mmm` form used in command-line arguments.

use std::time::Duration;

/// Parse `HH:MM:SS[.frac]` into a duration. The fractional part may have any
/// precision (ffmpeg prints centiseconds). Returns `None` on any malformed
/// field; callers treat that as a parse anomaly, not an error.
pub fn parse_timestamp(s: &str) -> Option<Duration> {
    let mut parts = s.splitn(3, ':');
    let hours: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let rest = parts.next()?;

    let (secs_str, frac_str) = match rest.split_once('.') {
        Some((s, f)) => (s, Some(f)),
        None => (rest, None),
    };
    let seconds: u64 = secs_str.parse().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    let mut millis = (hours * 3600 + minutes * 60 + seconds) * 1000;
    if let Some(frac) = frac_str {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Scale the fraction to milliseconds whatever its printed precision.
        let digits: String = frac.chars().take(3).collect();
        let mut frac_ms: u64 = digits.parse().ok()?;
        for _ in digits.len()..3 {
            frac_ms *= 10;
        }
        millis += frac_ms;
    }
    Some(Duration::from_millis(millis))
}

/// Format a duration as `HH:MM:SS.mmm` for ffmpeg arguments (`-ss`, `-to`).
pub fn format_timestamp(d: Duration) -> String {
    let total_ms = d.as_millis();
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{hours:02}:{mins:02}:{secs:02}.{ms:03}")
}
