//! Transcript Parsing and Export
//!
//! Parses the SRT-style block format produced by transcription providers:
//!
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:04,000
//! First caption text
//!
//! 2
//! 00:00:05,500 --> 00:00:08,000
//! Second caption text
//! with multiple lines
//! ```
//!
//! Parsing is lenient. A block that is too short or whose timing line does
//! not carry two `HH:MM:SS,mmm` timestamps is dropped and the remaining blocks
//! are still parsed.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::Cue;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while parsing a transcript
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Timestamp does not match `HH:MM:SS,mmm`
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A block is structurally unusable and contributes no cue
    #[error("Malformed cue block #{block}: {reason}")]
    MalformedCueBlock { block: usize, reason: String },
}

/// Minimum non-empty lines in a block: index, timing, one line of text
const MIN_BLOCK_LINES: usize = 3;

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{2}):(\d{2}):(\d{2}),(\d{3})").expect("timestamp pattern is valid")
    })
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses transcript text into cues, in input order.
///
/// Malformed blocks are skipped and logged at debug level; this never fails.
pub fn parse_cues(content: &str) -> Vec<Cue> {
    let mut cues = Vec::new();

    for (index, block) in split_blocks(content).iter().enumerate() {
        match parse_block(index, block) {
            Ok(cue) => cues.push(cue),
            Err(e) => debug!("Skipping transcript block: {}", e),
        }
    }

    cues
}

/// Groups non-blank lines into blocks separated by blank lines
fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// Parses a single block of non-empty lines
fn parse_block(index: usize, lines: &[&str]) -> Result<Cue, ParseError> {
    if lines.len() < MIN_BLOCK_LINES {
        return Err(ParseError::MalformedCueBlock {
            block: index,
            reason: format!("expected at least {} lines, got {}", MIN_BLOCK_LINES, lines.len()),
        });
    }

    let timing_line = lines[1];
    let mut stamps = timestamp_pattern().find_iter(timing_line);
    let (start, end) = match (stamps.next(), stamps.next()) {
        (Some(start), Some(end)) => (start.as_str(), end.as_str()),
        _ => {
            return Err(ParseError::MalformedCueBlock {
                block: index,
                reason: format!("timing line has no start/end pair: {}", timing_line),
            })
        }
    };

    let start_sec = parse_srt_timestamp(start)?;
    let end_sec = parse_srt_timestamp(end)?;
    let text = lines[2..].join("\n");

    Ok(Cue::new(start_sec, end_sec, &text))
}

/// Parses an SRT timestamp (e.g., "00:01:23,456") into seconds
///
/// Computed as `H*3600 + M*60 + S + ms/1000`.
pub fn parse_srt_timestamp(ts: &str) -> Result<f64, ParseError> {
    let ts = ts.trim();
    let caps = timestamp_pattern()
        .captures(ts)
        .filter(|c| c.get(0).is_some_and(|m| m.as_str().len() == ts.len()))
        .ok_or_else(|| ParseError::InvalidTimestamp(ts.to_string()))?;

    let field = |i: usize| -> Result<u32, ParseError> {
        caps[i]
            .parse()
            .map_err(|_| ParseError::InvalidTimestamp(ts.to_string()))
    };

    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let millis = field(4)?;

    Ok((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

// =============================================================================
// Export
// =============================================================================

/// Exports cues to SRT format
pub fn export_srt(cues: &[Cue]) -> String {
    let mut output = String::new();

    for (index, cue) in cues.iter().enumerate() {
        // Sequence number
        output.push_str(&format!("{}\n", index + 1));

        // Timestamps
        let start = format_srt_timestamp(cue.start_sec);
        let end = format_srt_timestamp(cue.end_sec);
        output.push_str(&format!("{} --> {}\n", start, end));

        // Text
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output.trim_end().to_string()
}

/// Formats seconds as SRT timestamp (00:00:00,000)
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Parsing Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_cues_basic() {
        let srt = r#"1
00:00:01,000 --> 00:00:04,000
Hello World

2
00:00:05,500 --> 00:00:08,000
Second caption
"#;

        let cues = parse_cues(srt);
        assert_eq!(cues.len(), 2);

        assert_eq!(cues[0].start_sec, 1.0);
        assert_eq!(cues[0].end_sec, 4.0);
        assert_eq!(cues[0].text, "Hello World");

        assert_eq!(cues[1].start_sec, 5.5);
        assert_eq!(cues[1].end_sec, 8.0);
        assert_eq!(cues[1].text, "Second caption");
    }

    #[test]
    fn test_parse_cues_multiline() {
        let srt = "1\n00:00:00,000 --> 00:00:05,000\nLine one\nLine two\nLine three\n";

        let cues = parse_cues(srt);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Line one\nLine two\nLine three");
    }

    #[test]
    fn test_parse_cues_count_matches_well_formed_blocks() {
        let source: Vec<Cue> = (0..25)
            .map(|i| Cue::new(i as f64, i as f64 + 0.75, &format!("cue {}", i)))
            .collect();

        let cues = parse_cues(&export_srt(&source));
        assert_eq!(cues.len(), 25);
        for (i, cue) in cues.iter().enumerate() {
            assert_eq!(cue.text, format!("cue {}", i));
        }
    }

    #[test]
    fn test_parse_cues_preserves_input_order() {
        let srt = "1\n00:00:09,000 --> 00:00:10,000\nlate\n\n2\n00:00:01,000 --> 00:00:02,000\nearly\n";

        let cues = parse_cues(srt);
        assert_eq!(cues[0].text, "late");
        assert_eq!(cues[1].text, "early");
    }

    #[test]
    fn test_parse_cues_skips_short_block() {
        let srt = r#"1
00:00:01,000 --> 00:00:02,000
First

2
00:00:03,000 --> 00:00:04,000

3
00:00:05,000 --> 00:00:06,000
Third
"#;

        let cues = parse_cues(srt);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "First");
        assert_eq!(cues[1].text, "Third");
        assert_eq!(cues[1].start_sec, 5.0);
    }

    #[test]
    fn test_parse_cues_skips_bad_timing_line() {
        let srt = r#"1
00:00:invalid --> 00:00:04,000
Hello

2
00:00:05,000 --> 00:00:06,000
Still parsed
"#;

        let cues = parse_cues(srt);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Still parsed");
    }

    #[test]
    fn test_parse_block_reports_malformed() {
        let err = parse_block(4, &["4", "00:00:01,000 --> 00:00:02,000"]).unwrap_err();
        assert!(matches!(err, ParseError::MalformedCueBlock { block: 4, .. }));

        let err = parse_block(0, &["1", "no timestamps here", "text"]).unwrap_err();
        assert!(matches!(err, ParseError::MalformedCueBlock { block: 0, .. }));
    }

    #[test]
    fn test_parse_cues_handles_crlf_and_extra_blank_lines() {
        let srt = "\r\n\r\n1\r\n00:00:01,500 --> 00:00:02,000\r\nWindows\r\n\r\n\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nline\r\n";

        let cues = parse_cues(srt);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start_sec, 1.5);
        assert_eq!(cues[0].text, "Windows");
    }

    #[test]
    fn test_parse_cues_empty_input() {
        assert!(parse_cues("").is_empty());
        assert!(parse_cues("\n\n   \n").is_empty());
    }

    #[test]
    fn test_parse_srt_timestamp() {
        assert_eq!(parse_srt_timestamp("00:00:01,500").unwrap(), 1.5);
        assert_eq!(parse_srt_timestamp("00:01:30,000").unwrap(), 90.0);
        assert_eq!(parse_srt_timestamp("01:30:00,000").unwrap(), 5400.0);
        assert_eq!(parse_srt_timestamp("00:00:00,100").unwrap(), 0.1);
    }

    #[test]
    fn test_parse_srt_timestamp_rejects_other_shapes() {
        for bad in ["00:00:01.500", "0:00:01,500", "00:00:01", "00:00:01,500 trailing", ""] {
            assert!(
                matches!(parse_srt_timestamp(bad), Err(ParseError::InvalidTimestamp(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    // -------------------------------------------------------------------------
    // Export Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_format_srt_timestamp() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(1.5), "00:00:01,500");
        assert_eq!(format_srt_timestamp(90.0), "00:01:30,000");
        assert_eq!(format_srt_timestamp(5400.0), "01:30:00,000");
    }

    #[test]
    fn test_export_srt() {
        let cues = vec![
            Cue::new(1.0, 4.0, "Hello World"),
            Cue::new(5.5, 8.0, "Second\nMultiline"),
        ];

        let srt = export_srt(&cues);
        assert!(srt.starts_with("1\n00:00:01,000 --> 00:00:04,000\nHello World"));
        assert!(srt.contains("2\n00:00:05,500 --> 00:00:08,000\nSecond\nMultiline"));

        let parsed = parse_cues(&srt);
        assert_eq!(parsed, cues);
    }
}
