//! In-memory state store
//!
//! Used by tests and anywhere the watermark does not need to outlive the
//! process.

use std::sync::RwLock;

use super::{StateError, StateStore};
use crate::models::Watermark;

/// In-memory implementation of StateStore
pub struct InMemoryStateStore {
    watermark: RwLock<Watermark>,
    writes: RwLock<Vec<Watermark>>,
}

impl InMemoryStateStore {
    /// Create a store that has never been written
    pub fn new() -> Self {
        Self::with_watermark(Watermark::ZERO)
    }

    /// Create a store pre-seeded with a watermark
    pub fn with_watermark(watermark: Watermark) -> Self {
        Self {
            watermark: RwLock::new(watermark),
            writes: RwLock::new(Vec::new()),
        }
    }

    /// Every value passed to `write`, oldest first
    pub fn history(&self) -> Vec<Watermark> {
        self.writes.read().unwrap().clone()
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for InMemoryStateStore {
    fn read(&self) -> Result<Watermark, StateError> {
        Ok(*self.watermark.read().unwrap())
    }

    fn write(&self, watermark: Watermark) -> Result<(), StateError> {
        *self.watermark.write().unwrap() = watermark;
        self.writes.write().unwrap().push(watermark);
        Ok(())
    }
}
