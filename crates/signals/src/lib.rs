//! Signals crate - Business logic for the sensor data collector
//!
//! This crate provides platform-independent collector functionality including:
//! - Domain models (Watermark, Reading, Batch)
//! - CSV row parsing with per-line fault tolerance
//! - Watermark storage trait abstractions
//! - Device HTTP client
//! - Google Sheets client and service-account authentication
//! - Incremental sync engine and interval scheduler
//!
//! The engine only talks to collaborators through traits, so every stage
//! can be exercised with in-memory doubles.

pub mod config;
pub mod device;
pub mod models;
pub mod parse;
pub mod sheets;
pub mod storage;
pub mod sync;

pub use crate::config::CollectorConfig;
pub use device::{DeviceClient, DeviceSource};
pub use models::{Batch, Reading, RejectedLine, Watermark};
pub use parse::{RowError, parse_body, parse_line};
pub use sheets::{ServiceAccountAuth, SheetService, SheetsClient, Worksheet};
pub use storage::{FileStateStore, InMemoryStateStore, StateError, StateStore};
pub use sync::{
    CycleOutcome, CycleReport, Scheduler, SyncEngine, SyncError, SyncStage, interval_elapsed,
};
