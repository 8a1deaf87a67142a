//! File-backed watermark storage
//!
//! The state file holds nothing but the decimal text of the watermark,
//! e.g. `1700000123.5`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::warn;

use super::{StateError, StateStore};
use crate::models::Watermark;

/// Watermark stored as plain text in a single file
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by `path`; the file is created on first write
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for FileStateStore {
    /// Missing files and unparseable content (including bytes that are not
    /// UTF-8) all read as [`Watermark::ZERO`]. Any other I/O failure is an
    /// error so a permissions problem is never mistaken for "never synced".
    fn read(&self) -> Result<Watermark, StateError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Watermark::ZERO),
            Err(source) => {
                return Err(StateError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let content = String::from_utf8_lossy(&bytes);
        match Watermark::parse(&content) {
            Some(watermark) => Ok(watermark),
            None => {
                warn!(
                    "State file {} has unparseable content {:?}, starting from 0",
                    self.path.display(),
                    content.trim()
                );
                Ok(Watermark::ZERO)
            }
        }
    }

    fn write(&self, watermark: Watermark) -> Result<(), StateError> {
        let write_err = |source| StateError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        // Write atomically (write to temp, then rename)
        let temp_path = self.temp_path();
        fs::write(&temp_path, watermark.to_string()).map_err(write_err)?;
        fs::rename(&temp_path, &self.path).map_err(write_err)?;

        Ok(())
    }
}
