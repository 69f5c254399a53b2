//! [`FileStore`] backed by the local filesystem.

use super::FileStore;
use crate::error::StoreError;
use std::fs;
use std::path::{Path, PathBuf};

/// Local filesystem store.
///
/// Writes are atomic: the bytes go to `<file>.tmp` first and are renamed
/// over the target, so a crash mid-save never leaves a truncated profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl FsStore {
    pub fn new() -> Self {
        Self
    }
}

impl FileStore for FsStore {
    fn read_all(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        fs::read(path).map_err(|e| StoreError::from_io(path, e))
    }

    fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let mut temp_name = path.as_os_str().to_os_string();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, bytes).map_err(|e| StoreError::CantOpen {
            path: path.to_path_buf(),
            source: e,
        })?;
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::CantOpen {
                path: path.to_path_buf(),
                source: e,
            });
        }
        log::trace!("Wrote {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(path).map_err(|e| StoreError::CantOpen {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let entries = fs::read_dir(dir).map_err(|e| StoreError::from_io(dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::from_io(dir, e))?;
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}
