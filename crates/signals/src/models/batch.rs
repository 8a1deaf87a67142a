//! Batch of new readings collected within one sync cycle

use super::{Reading, RejectedLine, Watermark};
use crate::parse::parse_body;

/// Readings newer than the current watermark, in device order
///
/// A batch lives for exactly one cycle: it is built from the fetched body,
/// uploaded, and then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Accepted readings with `timestamp > watermark`, in source order
    pub rows: Vec<Reading>,
    /// Watermark to commit once `rows` are uploaded
    pub candidate: Watermark,
    /// Lines that failed to parse
    pub rejected: Vec<RejectedLine>,
    /// Number of non-blank lines examined
    pub lines_seen: usize,
}

impl Batch {
    /// Parse a device export and keep only readings past `watermark`
    ///
    /// `candidate` starts at `watermark` and only moves forward, so an empty
    /// batch or a batch of stale rows never lowers it.
    pub fn collect(body: &str, watermark: Watermark) -> Self {
        let (readings, rejected) = parse_body(body);
        let lines_seen = readings.len() + rejected.len();

        let mut candidate = watermark;
        let rows: Vec<Reading> = readings
            .into_iter()
            .filter(|r| watermark.admits(r.timestamp))
            .inspect(|r| candidate = candidate.advance(r.timestamp))
            .collect();

        Self {
            rows,
            candidate,
            rejected,
            lines_seen,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
