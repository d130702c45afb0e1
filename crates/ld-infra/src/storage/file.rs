use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use ld_core::ports::{DurableStoragePort, StorageError};
use tracing::debug;

/// Directory under the data root that holds one file per storage key.
const STORE_DIR: &str = "store";

/// File-backed durable storage: one `<key>.json` file per key.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves either the old or the new value.
#[derive(Clone)]
pub struct FileDurableStorage {
    base_dir: PathBuf,
}

impl FileDurableStorage {
    /// Create storage rooted at `<data_root>/store`, creating the directory.
    pub fn new_in_data_root(data_root: &Path) -> anyhow::Result<Self> {
        let base_dir = data_root.join(STORE_DIR);
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("failed to create storage dir {}", base_dir.display()))?;
        Ok(Self { base_dir })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", sanitize_key(key)))
    }

    fn map_io_error(context: &str, err: io::Error) -> StorageError {
        match err.kind() {
            io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound => {
                StorageError::Unavailable(format!("{context}: {err}"))
            }
            io::ErrorKind::InvalidData => StorageError::Corrupt(format!("{context}: {err}")),
            _ => StorageError::Other(format!("{context}: {err}")),
        }
    }
}

impl DurableStoragePort for FileDurableStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.file_path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::map_io_error("failed to read storage file", err)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.file_path(key);
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, value)
            .map_err(|err| Self::map_io_error("failed to write storage temp file", err))?;
        fs::rename(&temp_path, &path)
            .map_err(|err| Self::map_io_error("failed to rename storage file", err))?;
        debug!(key, bytes = value.len(), "Durable value written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.file_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::map_io_error("failed to delete storage file", err)),
        }
    }
}

/// Keys become file names; anything outside `[A-Za-z0-9._-]` is replaced.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
