//! Sync engine for moving device readings into the sheet
//!
//! One cycle is fetch → filter → upload → commit. Cycles can be retried
//! safely: the watermark only advances after rows are appended.

mod engine;
mod error;
mod report;
mod scheduler;

pub use engine::SyncEngine;
pub use error::{SyncError, SyncStage};
pub use report::{CycleOutcome, CycleReport};
pub use scheduler::{Scheduler, interval_elapsed};
