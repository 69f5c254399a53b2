//! Shared integration test helpers for par-saves.
//!
//! Include this module at the top of each test file that needs it:
//!
//! ```ignore
//! mod common;
//! use common::{fs_session, memory_session};
//! ```
//!
//! The `#[allow(dead_code)]` attribute suppresses warnings when only a
//! subset of helpers are used per file.

#![allow(dead_code)]

use par_saves::{DocumentTree, EventRecorder, MemoryStore, ProfileSession, SaveConfig, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A session over the real filesystem, saving into `<tmp>/saves`.
///
/// The `TempDir` must be kept alive for the duration of the test.
pub struct FsFixture {
    pub session: ProfileSession,
    pub recorder: Arc<EventRecorder>,
    pub save_dir: PathBuf,
    pub temp_dir: TempDir,
}

pub fn fs_session() -> FsFixture {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let save_dir = temp_dir.path().join("saves");
    let session = ProfileSession::open(SaveConfig::new(&save_dir));
    let recorder = Arc::new(EventRecorder::new());
    session.add_observer(recorder.clone());
    FsFixture {
        session,
        recorder,
        save_dir,
        temp_dir,
    }
}

/// A session over an in-memory store rooted at `/saves`.
pub struct MemoryFixture {
    pub session: ProfileSession,
    pub store: Arc<MemoryStore>,
    pub recorder: Arc<EventRecorder>,
}

pub fn memory_session() -> MemoryFixture {
    memory_session_with(SaveConfig::new("/saves"))
}

pub fn memory_session_with(config: SaveConfig) -> MemoryFixture {
    let store = Arc::new(MemoryStore::new());
    let session = ProfileSession::new(config, store.clone());
    let recorder = Arc::new(EventRecorder::new());
    session.add_observer(recorder.clone());
    MemoryFixture {
        session,
        store,
        recorder,
    }
}

/// Convert a `json!` object literal into a document.
pub fn doc(value: Value) -> DocumentTree {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
