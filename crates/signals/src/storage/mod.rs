//! Watermark storage traits and implementations
//!
//! This module defines the storage abstraction for the sync watermark.
//! The trait-based design allows swapping the file-backed store for an
//! in-memory one in tests.

mod file;
mod memory;
mod traits;

pub use file::FileStateStore;
pub use memory::InMemoryStateStore;
pub use traits::{StateError, StateStore};
