//! Single-flight background saves.
//!
//! At most one worker thread writes profiles at a time. A `save` that
//! arrives while a worker is busy replaces the single pending slot instead of
//! starting a second worker; the busy worker picks it up when the current
//! write finishes. Every `ProfileSaveStart` is followed by exactly one
//! `ProfileSaved` or `ProfileSaveFailed`.

use crate::catalog::ProfileCatalog;
use crate::error::{ErrorCode, SaveError};
use crate::events::{Notifier, SaveEvent};
use crate::store::FileStore;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A serialized snapshot waiting to be written, consumed exactly once.
#[derive(Debug, Clone)]
pub struct SaveTask {
    /// Profile captured when the save was requested.
    pub profile_name: String,
    /// Encoded document.
    pub bytes: Vec<u8>,
}

/// Coordinator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    Idle,
    Saving,
}

#[derive(Debug)]
struct SlotState {
    phase: SavePhase,
    pending: Option<SaveTask>,
}

/// State shared with the worker thread.
struct SaveShared {
    catalog: Arc<ProfileCatalog>,
    store: Arc<dyn FileStore>,
    notifier: Arc<Notifier>,
    slot: Mutex<SlotState>,
    /// Held for the duration of every file write.
    write_lock: Mutex<()>,
}

impl SaveShared {
    /// Write `first`, then any tasks queued meanwhile, then go idle.
    ///
    /// `first` was already announced by the dispatcher.
    fn run(&self, first: SaveTask) {
        let mut task = first;
        loop {
            self.write_reporting_panics(task);
            task = {
                let mut slot = self.slot.lock();
                match slot.pending.take() {
                    Some(task) => task,
                    None => {
                        slot.phase = SavePhase::Idle;
                        return;
                    }
                }
            };
            self.notifier.emit(SaveEvent::ProfileSaveStart);
        }
    }

    /// A panic inside the store still ends in `ProfileSaveFailed`, and the
    /// worker keeps draining the pending slot afterwards.
    fn write_reporting_panics(&self, task: SaveTask) {
        let name = task.profile_name.clone();
        if panic::catch_unwind(AssertUnwindSafe(|| self.write(task))).is_err() {
            log::error!("Save worker panicked while writing profile '{}'", name);
            self.notifier
                .emit(SaveEvent::ProfileSaveFailed { code: ErrorCode::CantOpen });
        }
    }

    fn write(&self, task: SaveTask) {
        let outcome = {
            let _guard = self.write_lock.lock();
            match self.catalog.lookup(&task.profile_name) {
                Some(path) => self
                    .store
                    .write_all(&path, &task.bytes)
                    .map(|()| path)
                    .map_err(SaveError::from),
                None => Err(SaveError::FileNotFound {
                    path: self.catalog.config().profile_path(&task.profile_name),
                }),
            }
        };

        match outcome {
            Ok(path) => {
                log::info!(
                    "Saved profile '{}' ({} bytes) to {:?}",
                    task.profile_name,
                    task.bytes.len(),
                    path
                );
                self.notifier.emit(SaveEvent::ProfileSaved {
                    name: task.profile_name,
                });
            }
            Err(e) => {
                log::error!("Failed to save profile '{}': {}", task.profile_name, e);
                self.notifier
                    .emit(SaveEvent::ProfileSaveFailed { code: e.code() });
            }
        }
    }
}

/// Runs profile writes on a background thread, one at a time.
pub struct SaveCoordinator {
    shared: Arc<SaveShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SaveCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveCoordinator")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl SaveCoordinator {
    pub fn new(
        catalog: Arc<ProfileCatalog>,
        store: Arc<dyn FileStore>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            shared: Arc::new(SaveShared {
                catalog,
                store,
                notifier,
                slot: Mutex::new(SlotState {
                    phase: SavePhase::Idle,
                    pending: None,
                }),
                write_lock: Mutex::new(()),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> SavePhase {
        self.shared.slot.lock().phase
    }

    pub fn is_saving(&self) -> bool {
        self.phase() == SavePhase::Saving
    }

    /// Queue `task` for writing.
    ///
    /// Starts a worker when idle. When a worker is already running the task
    /// replaces any pending one and no new worker is started.
    pub fn dispatch(&self, task: SaveTask) {
        let mut worker = self.worker.lock();
        {
            let mut slot = self.shared.slot.lock();
            if slot.phase == SavePhase::Saving {
                if let Some(replaced) = slot.pending.replace(task) {
                    log::trace!(
                        "Dropping queued save of '{}' in favor of a newer request",
                        replaced.profile_name
                    );
                }
                log::debug!("Save already in flight, request queued");
                return;
            }
            slot.phase = SavePhase::Saving;
        }

        // The previous worker went idle before releasing the slot, so this
        // join returns promptly.
        if let Some(finished) = worker.take()
            && finished.join().is_err()
        {
            log::error!("Previous save worker panicked");
        }

        self.shared.notifier.emit(SaveEvent::ProfileSaveStart);

        let handoff = Arc::new(Mutex::new(Some(task)));
        let spawned = {
            let shared = Arc::clone(&self.shared);
            let handoff = Arc::clone(&handoff);
            std::thread::Builder::new()
                .name("par-saves-save".into())
                .spawn(move || {
                    if let Some(task) = handoff.lock().take() {
                        shared.run(task);
                    }
                })
        };
        match spawned {
            Ok(handle) => {
                log::debug!("Dispatched save worker");
                *worker = Some(handle);
            }
            Err(e) => {
                log::error!("Failed to spawn save worker, saving inline: {:?}", e);
                drop(worker);
                if let Some(task) = handoff.lock().take() {
                    self.shared.run(task);
                }
            }
        }
    }

    /// Report a save that failed before it could be queued.
    pub fn report_failure(&self, error: &SaveError) {
        log::error!("Save aborted before dispatch: {}", error);
        self.shared.notifier.emit(SaveEvent::ProfileSaveStart);
        self.shared
            .notifier
            .emit(SaveEvent::ProfileSaveFailed { code: error.code() });
    }

    /// Block until no worker is running.
    pub fn wait_idle(&self) {
        loop {
            let handle = self.worker.lock().take();
            match handle {
                Some(handle) => {
                    if handle.join().is_err() {
                        log::error!("Save worker panicked");
                        self.shared.slot.lock().phase = SavePhase::Idle;
                    }
                }
                None => return,
            }
        }
    }
}

impl Drop for SaveCoordinator {
    fn drop(&mut self) {
        self.wait_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SaveConfig;
    use crate::error::StoreError;
    use crate::events::EventRecorder;
    use crate::store::MemoryStore;
    use par_saves_document::DocumentTree;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Fixture {
        coordinator: SaveCoordinator,
        store: Arc<MemoryStore>,
        recorder: Arc<EventRecorder>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(Notifier::new());
        let recorder = Arc::new(EventRecorder::new());
        let catalog = Arc::new(ProfileCatalog::new(
            SaveConfig::new("/saves"),
            store.clone(),
            notifier.clone(),
        ));
        catalog.create("alpha", &DocumentTree::new()).unwrap();
        notifier.add_observer(recorder.clone());
        Fixture {
            coordinator: SaveCoordinator::new(catalog, store.clone(), notifier),
            store,
            recorder,
        }
    }

    fn task(name: &str, bytes: &str) -> SaveTask {
        SaveTask {
            profile_name: name.to_string(),
            bytes: bytes.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_dispatch_writes_and_goes_idle() {
        let f = fixture();
        f.coordinator.dispatch(task("alpha", "{\"a\": 1}"));
        f.coordinator.wait_idle();

        assert_eq!(f.coordinator.phase(), SavePhase::Idle);
        assert_eq!(
            f.store.contents(Path::new("/saves/alpha.save")).unwrap(),
            b"{\"a\": 1}"
        );
        assert_eq!(
            f.recorder.drain_events(),
            vec![
                SaveEvent::ProfileSaveStart,
                SaveEvent::ProfileSaved {
                    name: "alpha".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_requests_during_flight_coalesce() {
        let f = fixture();
        let gate = f.store.hold_writes();

        f.coordinator.dispatch(task("alpha", "1"));
        assert!(f.coordinator.is_saving());
        f.coordinator.dispatch(task("alpha", "2"));
        f.coordinator.dispatch(task("alpha", "3"));

        drop(gate);
        f.coordinator.wait_idle();

        // Profile creation, the first save, and the newest queued snapshot.
        assert_eq!(f.store.write_count(), 3);
        assert_eq!(
            f.store.contents(Path::new("/saves/alpha.save")).unwrap(),
            b"3"
        );
        let kinds: Vec<_> = f.recorder.drain_events().iter().map(SaveEvent::kind).collect();
        assert_eq!(
            kinds,
            [
                "profile_save_start",
                "profile_saved",
                "profile_save_start",
                "profile_saved"
            ]
        );
    }

    #[test]
    fn test_write_failure_is_reported_as_event() {
        let f = fixture();
        f.store.set_fail_writes(true);

        f.coordinator.dispatch(task("alpha", "{}"));
        f.coordinator.wait_idle();

        assert_eq!(
            f.recorder.drain_events(),
            vec![
                SaveEvent::ProfileSaveStart,
                SaveEvent::ProfileSaveFailed {
                    code: ErrorCode::CantOpen
                },
            ]
        );
    }

    #[test]
    fn test_uncataloged_profile_fails_with_file_not_found() {
        let f = fixture();
        f.coordinator.dispatch(task("ghost", "{}"));
        f.coordinator.wait_idle();

        assert_eq!(
            f.recorder.drain_events().last(),
            Some(&SaveEvent::ProfileSaveFailed {
                code: ErrorCode::FileNotFound
            })
        );
        assert!(f.store.contents(Path::new("/saves/ghost.save")).is_none());
    }

    #[test]
    fn test_worker_restarts_after_idle() {
        let f = fixture();
        f.coordinator.dispatch(task("alpha", "1"));
        f.coordinator.wait_idle();
        f.coordinator.dispatch(task("alpha", "2"));
        f.coordinator.wait_idle();

        assert_eq!(
            f.store.contents(Path::new("/saves/alpha.save")).unwrap(),
            b"2"
        );
        assert_eq!(f.recorder.drain_events().len(), 4);
    }

    /// Store whose next write panics once armed.
    #[derive(Default)]
    struct PanickingStore {
        inner: MemoryStore,
        panic_next_write: AtomicBool,
    }

    impl FileStore for PanickingStore {
        fn read_all(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
            self.inner.read_all(path)
        }

        fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
            if self.panic_next_write.swap(false, Ordering::SeqCst) {
                panic!("write exploded");
            }
            self.inner.write_all(path, bytes)
        }

        fn is_dir(&self, path: &Path) -> bool {
            self.inner.is_dir(path)
        }

        fn create_dir_all(&self, path: &Path) -> Result<(), StoreError> {
            self.inner.create_dir_all(path)
        }

        fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
            self.inner.list_dir(dir)
        }
    }

    #[test]
    fn test_panicking_write_reports_failure_and_worker_recovers() {
        let store = Arc::new(PanickingStore::default());
        let notifier = Arc::new(Notifier::new());
        let recorder = Arc::new(EventRecorder::new());
        let catalog = Arc::new(ProfileCatalog::new(
            SaveConfig::new("/saves"),
            store.clone(),
            notifier.clone(),
        ));
        catalog.create("alpha", &DocumentTree::new()).unwrap();
        notifier.add_observer(recorder.clone());
        let coordinator = SaveCoordinator::new(catalog, store.clone(), notifier);

        store.panic_next_write.store(true, Ordering::SeqCst);
        coordinator.dispatch(task("alpha", "1"));
        coordinator.wait_idle();
        assert_eq!(coordinator.phase(), SavePhase::Idle);

        coordinator.dispatch(task("alpha", "2"));
        coordinator.wait_idle();

        assert_eq!(
            store.inner.contents(Path::new("/saves/alpha.save")).unwrap(),
            b"2"
        );
        assert_eq!(
            recorder.drain_events(),
            vec![
                SaveEvent::ProfileSaveStart,
                SaveEvent::ProfileSaveFailed {
                    code: ErrorCode::CantOpen
                },
                SaveEvent::ProfileSaveStart,
                SaveEvent::ProfileSaved {
                    name: "alpha".to_string()
                },
            ]
        );
    }
}
