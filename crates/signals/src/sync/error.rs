//! Cycle failure taxonomy

use std::fmt;

use crate::storage::StateError;

/// Stage of a sync cycle at which it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStage {
    /// Opening the sheet
    Connect,
    /// Downloading the device export
    Fetch,
    /// Reading the current watermark
    State,
    /// Appending rows to the sheet
    Upload,
    /// Persisting the new watermark
    Commit,
}

impl SyncStage {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStage::Connect => "connect",
            SyncStage::Fetch => "fetch",
            SyncStage::State => "state",
            SyncStage::Upload => "upload",
            SyncStage::Commit => "commit",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that ended a sync cycle
///
/// None of these stop the collector; the next scheduled cycle starts from
/// whatever watermark was last committed.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to connect to Google Sheets: {0:#}")]
    Connect(anyhow::Error),
    #[error("Failed to fetch data from device: {0:#}")]
    Fetch(anyhow::Error),
    #[error("Failed to read sync state: {0}")]
    State(#[source] StateError),
    #[error("Failed to write to Google Sheets: {0:#}")]
    Upload(anyhow::Error),
    #[error("Rows uploaded but failed to save sync state: {0}")]
    Commit(#[source] StateError),
}

impl SyncError {
    pub fn stage(&self) -> SyncStage {
        match self {
            SyncError::Connect(_) => SyncStage::Connect,
            SyncError::Fetch(_) => SyncStage::Fetch,
            SyncError::State(_) => SyncStage::State,
            SyncError::Upload(_) => SyncStage::Upload,
            SyncError::Commit(_) => SyncStage::Commit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_stage_mapping() {
        assert_eq!(SyncError::Connect(anyhow::anyhow!("x")).stage(), SyncStage::Connect);
        assert_eq!(SyncError::Fetch(anyhow::anyhow!("x")).stage(), SyncStage::Fetch);
        assert_eq!(SyncError::Upload(anyhow::anyhow!("x")).stage(), SyncStage::Upload);

        let state_err = StateError::Write {
            path: PathBuf::from("/tmp/state.txt"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(SyncError::Commit(state_err).stage(), SyncStage::Commit);
    }

    #[test]
    fn test_display_includes_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("GET http://device/data");
        let msg = SyncError::Fetch(err).to_string();
        assert_eq!(
            msg,
            "Failed to fetch data from device: GET http://device/data: connection refused"
        );
    }
}
