//! Storage trait definitions

use std::path::PathBuf;

use crate::models::Watermark;

/// Errors from reading or persisting the watermark
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to read state file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write state file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Trait for watermark persistence
///
/// There is exactly one writer (the sync engine), so implementations only
/// need to guarantee that a reader never observes a partially written value.
pub trait StateStore: Send + Sync {
    /// Read the persisted watermark
    ///
    /// A store that has never been written returns [`Watermark::ZERO`].
    fn read(&self) -> Result<Watermark, StateError>;

    /// Overwrite the persisted watermark
    fn write(&self, watermark: Watermark) -> Result<(), StateError>;
}
