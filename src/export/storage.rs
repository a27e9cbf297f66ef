//! Where the document and attachments are written.

use std::path::Path;

use crate::error::{BinderError, Result};

/// Minimal write-only filesystem interface.
pub trait Storage {
    /// Create a directory and its parents. Succeeds if it already exists.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Create or truncate `path` and write `bytes` to it.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;
}

/// [`Storage`] on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| BinderError::io(path, e))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        std::fs::write(path, bytes).map_err(|e| BinderError::io(path, e))
    }
}
