//! Watermark tracking for incremental sync

use std::fmt;

/// Timestamp of the most recently accepted reading
///
/// Every reading at or below the watermark is considered already synced.
/// Persisted between runs so a restart resumes where the last successful
/// cycle left off.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Watermark(f64);

impl Watermark {
    /// Watermark of a collector that has never synced
    pub const ZERO: Watermark = Watermark(0.0);

    /// Create a watermark from a finite timestamp
    ///
    /// Returns `None` for `NaN` or infinities.
    pub fn new(ts: f64) -> Option<Self> {
        ts.is_finite().then_some(Self(ts))
    }

    /// Parse the textual form written by [`Watermark`]'s `Display` impl
    ///
    /// Surrounding whitespace is ignored. Non-numeric or non-finite text
    /// yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        s.trim().parse::<f64>().ok().and_then(Self::new)
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Whether a reading at `ts` is newer than this watermark
    pub fn admits(self, ts: f64) -> bool {
        ts > self.0
    }

    /// Move the watermark forward to `ts`, never backwards
    pub fn advance(self, ts: f64) -> Self {
        if self.admits(ts) { Self(ts) } else { self }
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
