//! Snapshot line format.
//!
//! A snapshot is plain text: one signed 64-bit decimal timestamp per line,
//! newline-terminated, with no header, footer or checksum. An empty input is
//! an empty snapshot.

use crate::domain::window::Timestamp;
use std::io::{self, BufRead, BufWriter, Write};
use thiserror::Error;

/// What to do with a snapshot line that is not a valid timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedLinePolicy {
    /// Skip the line, log it and count it in [`LoadReport::skipped`].
    #[default]
    Skip,
    /// Abort the whole load; nothing from the snapshot is kept.
    Reject,
}

impl MalformedLinePolicy {
    /// Parse a policy from its configuration name (`skip` or `reject`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "skip" => Some(MalformedLinePolicy::Skip),
            "reject" => Some(MalformedLinePolicy::Reject),
            _ => None,
        }
    }
}

/// Errors raised while reading or writing snapshot lines.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The underlying reader or writer failed.
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A line is not a valid timestamp and the policy is [`MalformedLinePolicy::Reject`].
    #[error("malformed snapshot line {line}: {content:?}")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// The offending line, lossily decoded.
        content: String,
    },
}

/// Outcome of decoding a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of timestamps decoded.
    pub loaded: usize,
    /// Number of malformed lines skipped.
    pub skipped: usize,
}

/// Decode every timestamp in `source`.
///
/// Surrounding whitespace (including a trailing `\r`) is ignored and blank
/// lines are dropped without being counted. Malformed lines are handled
/// according to `policy`. On error nothing is returned, so callers never see a
/// partially decoded snapshot.
pub fn decode<R: BufRead>(
    source: R,
    policy: MalformedLinePolicy,
) -> Result<(Vec<Timestamp>, LoadReport), SnapshotError> {
    let mut timestamps = Vec::new();
    let mut skipped = 0;

    for (index, raw) in source.split(b'\n').enumerate() {
        let raw = raw?;
        let line = index + 1;

        let parsed = std::str::from_utf8(&raw)
            .ok()
            .map(str::trim)
            .map(|text| (text.is_empty(), text.parse::<Timestamp>()));

        match parsed {
            Some((true, _)) => continue,
            Some((false, Ok(timestamp))) => timestamps.push(timestamp),
            _ => {
                let content = String::from_utf8_lossy(&raw).trim().to_string();
                match policy {
                    MalformedLinePolicy::Skip => {
                        tracing::warn!(line, content = %content, "skipping malformed snapshot line");
                        skipped += 1;
                    }
                    MalformedLinePolicy::Reject => {
                        return Err(SnapshotError::MalformedLine { line, content });
                    }
                }
            }
        }
    }

    let report = LoadReport {
        loaded: timestamps.len(),
        skipped,
    };
    Ok((timestamps, report))
}

/// Write `timestamps` to `sink`, one per line, and flush.
///
/// Returns the number of timestamps written. Success is only reported once
/// the buffered output has been flushed into `sink`.
pub fn encode<'a, W, I>(sink: W, timestamps: I) -> Result<usize, SnapshotError>
where
    W: Write,
    I: IntoIterator<Item = &'a Timestamp>,
{
    let mut writer = BufWriter::new(sink);
    let mut written = 0;

    for timestamp in timestamps {
        writeln!(writer, "{}", timestamp)?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}
