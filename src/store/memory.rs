//! In-memory [`FileStore`] for tests and embedding.

use super::FileStore;
use crate::error::StoreError;
use parking_lot::{Mutex, MutexGuard};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A [`FileStore`] that keeps files in a map.
///
/// Failure switches make individual operations fail with
/// [`StoreError::CantOpen`], and [`MemoryStore::hold_writes`] blocks every
/// `write_all` until the returned guard is dropped, which lets tests keep a
/// background save in flight for as long as they need.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
    write_gate: Mutex<()>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_create_dir: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a file directly, creating its parent directory.
    pub fn insert_file(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.dirs.lock().insert(parent.to_path_buf());
        }
        self.files.lock().insert(path, bytes.into());
    }

    /// Delete `path`, returning its contents.
    pub fn remove_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().remove(path)
    }

    /// Current contents of `path`, if present.
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().get(path).cloned()
    }

    /// Number of successful `write_all` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_create_dir(&self, fail: bool) {
        self.fail_create_dir.store(fail, Ordering::SeqCst);
    }

    /// Block all writes until the guard is dropped.
    pub fn hold_writes(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock()
    }

    fn injected(path: &Path, what: &str) -> StoreError {
        StoreError::CantOpen {
            path: path.to_path_buf(),
            source: io::Error::other(format!("injected {what} failure")),
        }
    }
}

impl FileStore for MemoryStore {
    fn read_all(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::injected(path, "read"));
        }
        self.contents(path)
            .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))
    }

    fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let _gate = self.write_gate.lock();
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected(path, "write"));
        }
        let parent_exists = path
            .parent()
            .is_none_or(|parent| self.dirs.lock().contains(parent));
        if !parent_exists {
            return Err(StoreError::CantOpen {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        self.files.lock().insert(path.to_path_buf(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.lock().contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), StoreError> {
        if self.fail_create_dir.load(Ordering::SeqCst) {
            return Err(Self::injected(path, "create_dir"));
        }
        let mut dirs = self.dirs.lock();
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                dirs.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
        if !self.is_dir(dir) {
            return Err(StoreError::NotFound(dir.to_path_buf()));
        }
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect())
    }
}
