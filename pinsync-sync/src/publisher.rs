//! Registry pointer publishing.
//!
//! ## `FilePublisher` write protocol
//!
//! 1. Skip if no destination is configured.
//! 2. Ensure the parent directory exists.
//! 3. Write `<cid>\n` to `<path>.tmp`.
//! 4. Rename over the final path (atomic on POSIX).
//!
//! A concurrent reader therefore sees either the previous complete value or
//! the new one, never a truncated file.

use std::path::{Path, PathBuf};

use pinsync_core::Cid;

use crate::error::{io_err, SyncError};

/// Durable single-value sink for the latest registry identifier.
pub trait RegistryPublisher: Send + Sync {
    fn publish(&self, cid: &Cid) -> Result<(), SyncError>;
}

/// Publishes the registry identifier to a single-line text file.
#[derive(Debug, Clone)]
pub struct FilePublisher {
    path: PathBuf,
}

impl FilePublisher {
    /// An empty `path` disables publishing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl RegistryPublisher for FilePublisher {
    fn publish(&self, cid: &Cid) -> Result<(), SyncError> {
        if self.path.as_os_str().is_empty() {
            tracing::debug!("registry pointer path not configured, skipping");
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
        }

        let tmp = self.tmp_path();
        std::fs::write(&tmp, format!("{cid}\n")).map_err(|e| io_err(&tmp, e))?;

        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&self.path, e));
        }

        tracing::info!(cid = %cid, path = %self.path.display(), "wrote registry CID");
        Ok(())
    }
}

/// Read back a published pointer, trimming the trailing newline.
pub fn read_pointer(path: &Path) -> Result<Option<Cid>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let value = raw.trim();
            Ok((!value.is_empty()).then(|| Cid::from(value)))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}
