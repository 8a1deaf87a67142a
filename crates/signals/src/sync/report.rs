//! Result of a single sync cycle

use chrono::{DateTime, Utc};

use super::{SyncError, SyncStage};
use crate::models::{RejectedLine, Watermark};

/// How a sync cycle ended
#[derive(Debug)]
pub enum CycleOutcome {
    /// New rows were appended and the watermark committed
    Uploaded { rows: usize, watermark: Watermark },
    /// Nothing newer than the watermark was found
    NoNewData,
    /// The cycle stopped early; the watermark was not advanced
    Failed(SyncError),
}

/// Statistics and outcome from one sync cycle
///
/// Returned to the caller instead of being logged by the engine, so the
/// caller decides how to render it.
#[derive(Debug)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// When the cycle started
    pub started_at: DateTime<Utc>,
    /// Watermark read at the start of the cycle, if the read succeeded
    pub previous_watermark: Option<Watermark>,
    /// Non-blank lines in the device export
    pub lines_seen: usize,
    /// Lines that failed to parse
    pub rejected: Vec<RejectedLine>,
    /// Duration of the cycle
    pub duration_ms: u64,
}

impl CycleReport {
    pub(crate) fn started() -> Self {
        Self {
            outcome: CycleOutcome::NoNewData,
            started_at: Utc::now(),
            previous_watermark: None,
            lines_seen: 0,
            rejected: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, CycleOutcome::Failed(_))
    }

    /// Number of rows appended to the sheet in this cycle
    pub fn rows_uploaded(&self) -> usize {
        match self.outcome {
            CycleOutcome::Uploaded { rows, .. } => rows,
            _ => 0,
        }
    }

    pub fn failed_stage(&self) -> Option<SyncStage> {
        match &self.outcome {
            CycleOutcome::Failed(err) => Some(err.stage()),
            _ => None,
        }
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        match &self.outcome {
            CycleOutcome::Uploaded { rows, watermark } => {
                format!("Uploaded {rows} new rows, watermark now {watermark}")
            }
            CycleOutcome::NoNewData => "No new data found.".to_string(),
            CycleOutcome::Failed(err) => format!("Cycle failed at {} stage: {}", err.stage(), err),
        }
    }
}
