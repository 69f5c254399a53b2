//! File access capability used by the catalog and save worker.
//!
//! Profiles never touch `std::fs` directly. Everything goes through a
//! [`FileStore`] so the same session logic runs against the real filesystem
//! ([`FsStore`]) or an in-memory map with failure injection
//! ([`MemoryStore`]).

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use std::path::{Path, PathBuf};

/// Whole-file read/write plus the directory operations the catalog needs.
///
/// Implementations are shared between the caller and the background save
/// worker, so they must be `Send + Sync`.
pub trait FileStore: Send + Sync {
    /// Read the entire file at `path`.
    fn read_all(&self, path: &Path) -> Result<Vec<u8>, StoreError>;

    /// Replace the contents of `path` with `bytes`, creating the file if
    /// needed.
    fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError>;

    /// Whether `path` exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<(), StoreError>;

    /// Full paths of the files directly inside `dir`, in enumeration order.
    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, StoreError>;
}
