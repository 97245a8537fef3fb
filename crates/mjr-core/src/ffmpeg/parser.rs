//! Streaming parser for ffmpeg's diagnostic output.
//!
//! ffmpeg writes everything to stderr: codec negotiation noise, a duration
//! declaration, a single "processing started" marker, repeated progress lines
//! and a blank line when the encode finishes. This parser is fed one line at
//! a time and yields normalized events; it knows nothing about jobs or tasks.
//!
//! Percent is computed from the embedded elapsed-time field against a
//! reference total duration, so it assumes roughly constant throughput. That
//! approximation is inherited, documented behavior: snapshots may regress
//! slightly and consumers clamp rather than treat it as a violation.

use std::time::Duration;

use super::time::parse_timestamp;

/// Literal line ffmpeg prints when encoding actually starts. Progress-shaped
/// lines seen before it are log noise and are ignored.
const START_MARKER: &str = "Press [q] to stop, [?] for help";

const DURATION_PREFIX: &str = "Duration: ";
const PROGRESS_PREFIX: &str = "size=";
const TIME_FIELD: &str = "time=";

/// Length of ffmpeg's `HH:MM:SS.ff` field.
const TIMESTAMP_LEN: usize = "00:00:00.00".len();

/// Normalized event produced from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserEvent {
    /// The start marker was seen. Percent may still be unknown if no
    /// duration was declared.
    Started,
    /// A progress line mapped to a completion percent in [0, 100].
    Progress(u8),
    /// A blank line after the marker: the encode block finished (100%).
    Finished,
}

/// Line-at-a-time progress parser for one ffmpeg run.
#[derive(Debug)]
pub struct ProgressParser {
    /// Reference total in milliseconds (percent denominator).
    total_ms: Option<u64>,
    /// A caller-supplied total takes precedence over the stream's own
    /// duration declaration.
    total_supplied: bool,
    /// Set between the start marker and the terminating blank line.
    started: bool,
}

impl ProgressParser {
    /// `known_total` is the caller's end-to-end duration, when it knows one
    /// (e.g. a bounded crop); otherwise the `Duration:` line is used.
    pub fn new(known_total: Option<Duration>) -> Self {
        Self {
            total_ms: known_total.map(|d| d.as_millis() as u64),
            total_supplied: known_total.is_some(),
            started: false,
        }
    }

    /// Feed one raw stream line. Returns an event when the line advances the
    /// protocol; anything else (noise, malformed progress) yields `None`.
    pub fn push_line(&mut self, raw: &str) -> Option<ParserEvent> {
        let line = raw.trim();

        if line == START_MARKER {
            self.started = true;
            return Some(ParserEvent::Started);
        }

        if !self.started {
            // Duration declaration arrives during codec negotiation, before
            // the marker. Example:
            //   Duration: 00:01:40.00, start: 0.000000, bitrate: 128 kb/s
            if !self.total_supplied {
                if let Some(rest) = line.strip_prefix(DURATION_PREFIX) {
                    if let Some(ms) = parse_field(rest) {
                        self.total_ms = Some(ms);
                    } else {
                        tracing::debug!(line = raw, "unparsable duration declaration");
                    }
                }
            }
            return None;
        }

        if line.is_empty() {
            // Blank line terminates the block; marker detection re-arms so a
            // following logical block is handled the same way.
            self.started = false;
            return Some(ParserEvent::Finished);
        }

        if line.starts_with(PROGRESS_PREFIX) {
            //   size=     512kB time=00:00:50.00 bitrate= 83.9kbits/s speed=25x
            let total = self.total_ms?;
            let at = line.find(TIME_FIELD)? + TIME_FIELD.len();
            match parse_field(&line[at..]) {
                Some(elapsed) if total > 0 => {
                    let percent = (elapsed as f64 / total as f64 * 100.0).round();
                    return Some(ParserEvent::Progress(percent.clamp(0.0, 100.0) as u8));
                }
                _ => {
                    tracing::debug!(line = raw, "unparsable progress line");
                    return None;
                }
            }
        }

        None
    }

    /// Whether the start marker has been seen and the block is still open.
    pub fn in_progress_block(&self) -> bool {
        self.started
    }

    /// The percent denominator currently in effect, in milliseconds.
    pub fn total_ms(&self) -> Option<u64> {
        self.total_ms
    }
}

/// Parse the leading `HH:MM:SS.ff` of a field that may have trailing text.
fn parse_field(s: &str) -> Option<u64> {
    let ts = s.get(..TIMESTAMP_LEN)?;
    parse_timestamp(ts).map(|d| d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "Press [q] to stop, [?] for help";

    fn progress_line(time: &str) -> String {
        format!("size=     512kB time={time} bitrate=  83.9kbits/s speed=  25x")
    }

    #[test]
    fn fifty_percent_from_declared_duration() {
        let mut p = ProgressParser::new(None);
        assert_eq!(
            p.push_line("  Duration: 00:01:40.00, start: 0.000000, bitrate: 128 kb/s"),
            None
        );
        assert_eq!(p.push_line(MARKER), Some(ParserEvent::Started));
        assert_eq!(
            p.push_line(&progress_line("00:00:50.00")),
            Some(ParserEvent::Progress(50))
        );
    }

    #[test]
    fn progress_before_marker_is_noise() {
        let mut p = ProgressParser::new(None);
        p.push_line("  Duration: 00:01:40.00, start: 0.000000, bitrate: 128 kb/s");
        // Identical content, but the marker has not been seen yet.
        assert_eq!(p.push_line(&progress_line("00:00:50.00")), None);
        assert_eq!(p.push_line(MARKER), Some(ParserEvent::Started));
        assert_eq!(
            p.push_line(&progress_line("00:00:25.00")),
            Some(ParserEvent::Progress(25))
        );
    }

    #[test]
    fn blank_line_after_marker_finishes_block() {
        let mut p = ProgressParser::new(None);
        p.push_line("  Duration: 00:01:40.00, start: 0.000000, bitrate: 128 kb/s");
        p.push_line(MARKER);
        p.push_line(&progress_line("00:00:10.00"));
        assert_eq!(p.push_line(""), Some(ParserEvent::Finished));
        // Block closed: further progress-shaped lines are noise again.
        assert_eq!(p.push_line(&progress_line("00:01:00.00")), None);
        assert!(!p.in_progress_block());
    }

    #[test]
    fn blank_line_before_marker_is_ignored() {
        let mut p = ProgressParser::new(None);
        assert_eq!(p.push_line(""), None);
        assert_eq!(p.push_line("   "), None);
    }

    #[test]
    fn supplied_total_takes_precedence() {
        let mut p = ProgressParser::new(Some(Duration::from_secs(50)));
        // Stream declares a longer duration; the caller's total wins.
        p.push_line("  Duration: 00:01:40.00, start: 0.000000, bitrate: 128 kb/s");
        p.push_line(MARKER);
        assert_eq!(
            p.push_line(&progress_line("00:00:25.00")),
            Some(ParserEvent::Progress(50))
        );
    }

    #[test]
    fn missing_duration_means_no_percent() {
        let mut p = ProgressParser::new(None);
        assert_eq!(p.push_line(MARKER), Some(ParserEvent::Started));
        // No denominator: progress lines cannot produce a percent and there
        // is no division by zero.
        assert_eq!(p.push_line(&progress_line("00:00:50.00")), None);
        assert_eq!(p.push_line(""), Some(ParserEvent::Finished));
    }

    #[test]
    fn percent_is_clamped_to_100() {
        let mut p = ProgressParser::new(Some(Duration::from_secs(10)));
        p.push_line(MARKER);
        assert_eq!(
            p.push_line(&progress_line("00:00:30.00")),
            Some(ParserEvent::Progress(100))
        );
    }

    #[test]
    fn malformed_progress_line_is_nonfatal() {
        let mut p = ProgressParser::new(Some(Duration::from_secs(100)));
        p.push_line(MARKER);
        assert_eq!(p.push_line("size=     512kB time=bogus bitrate=?"), None);
        assert_eq!(p.push_line("size= no time field at all"), None);
        // Parser keeps going afterwards.
        assert_eq!(
            p.push_line(&progress_line("00:00:50.00")),
            Some(ParserEvent::Progress(50))
        );
    }

    #[test]
    fn marker_detection_repeats_per_block() {
        let mut p = ProgressParser::new(Some(Duration::from_secs(100)));
        p.push_line(MARKER);
        assert_eq!(p.push_line(""), Some(ParserEvent::Finished));
        assert_eq!(p.push_line(MARKER), Some(ParserEvent::Started));
        assert_eq!(
            p.push_line(&progress_line("00:00:10.00")),
            Some(ParserEvent::Progress(10))
        );
    }
}
