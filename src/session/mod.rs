//! The currently selected profile and the operations on it.
//!
//! A [`ProfileSession`] owns one in-memory [`DocumentTree`] at a time.
//! Properties are addressed with dotted keys. Mutations emit
//! `SavesChanged`; writes to disk happen on a background worker (see
//! [`coordinator`]) and report their outcome only through events.
//!
//! All tree access goes through one lock, and `save` serializes the tree
//! under that lock before handing the bytes to the worker, so a save never
//! observes a half-applied edit.

pub mod coordinator;

use crate::catalog::ProfileCatalog;
use crate::config::{DecodePolicy, SaveConfig};
use crate::error::SaveError;
use crate::events::{Notifier, SaveEvent, SaveObserver};
use crate::store::{FileStore, FsStore};
use coordinator::{SaveCoordinator, SaveTask};
use par_saves_document::{
    DocumentTree, PropertyPath, Value, decode_document, encode_pretty, read_path, remove_path,
    write_path_creating,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

#[derive(Debug, Default)]
struct Selection {
    /// Empty when nothing is selected.
    name: String,
    tree: DocumentTree,
}

impl Selection {
    fn is_selected(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Handle to the selected profile.
///
/// Create one at startup and drop it at shutdown; dropping waits for an
/// in-flight save to finish. Independent sessions share nothing unless they
/// point at the same save directory.
pub struct ProfileSession {
    catalog: Arc<ProfileCatalog>,
    store: Arc<dyn FileStore>,
    notifier: Arc<Notifier>,
    selection: Mutex<Selection>,
    saver: SaveCoordinator,
}

impl std::fmt::Debug for ProfileSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileSession")
            .field("selected", &self.selected_name())
            .field("saver", &self.saver)
            .finish_non_exhaustive()
    }
}

impl ProfileSession {
    pub fn new(config: SaveConfig, store: Arc<dyn FileStore>) -> Self {
        let notifier = Arc::new(Notifier::new());
        let catalog = Arc::new(ProfileCatalog::new(
            config,
            Arc::clone(&store),
            Arc::clone(&notifier),
        ));
        let saver = SaveCoordinator::new(
            Arc::clone(&catalog),
            Arc::clone(&store),
            Arc::clone(&notifier),
        );
        Self {
            catalog,
            store,
            notifier,
            selection: Mutex::new(Selection::default()),
            saver,
        }
    }

    /// Session over the local filesystem.
    pub fn open(config: SaveConfig) -> Self {
        Self::new(config, Arc::new(FsStore::new()))
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    pub fn add_observer(&self, observer: Arc<dyn SaveObserver>) {
        self.notifier.add_observer(observer);
    }

    /// Stop delivering events to `observer`. Returns whether it was
    /// registered.
    pub fn remove_observer(&self, observer: &Arc<dyn SaveObserver>) -> bool {
        self.notifier.remove_observer(observer)
    }

    /// Channel receiving every event emitted after this call.
    pub fn subscribe(&self) -> Receiver<SaveEvent> {
        self.notifier.subscribe()
    }

    pub fn is_selected(&self) -> bool {
        self.selection.lock().is_selected()
    }

    /// Name of the selected profile, if any.
    pub fn selected_name(&self) -> Option<String> {
        let selection = self.selection.lock();
        selection.is_selected().then(|| selection.name.clone())
    }

    /// Copy of the whole selected document.
    pub fn current_profile(&self) -> Result<DocumentTree, SaveError> {
        let selection = self.selection.lock();
        if !selection.is_selected() {
            log::warn!("current_profile: no profile selected");
            return Err(SaveError::NoProfileSelected);
        }
        Ok(selection.tree.clone())
    }

    /// Value at dotted `key`. Misses are logged.
    pub fn get_property(&self, key: &str) -> Result<Value, SaveError> {
        let path = PropertyPath::parse(key);
        let selection = self.selection.lock();
        if !selection.is_selected() {
            log::warn!("get_property('{}'): no profile selected", key);
            return Err(SaveError::NoProfileSelected);
        }
        match read_path(&selection.tree, &path) {
            Some(value) => Ok(value.clone()),
            None => {
                log::warn!(
                    "Property '{}' not found in profile '{}'",
                    key,
                    selection.name
                );
                Err(SaveError::PathNotFound {
                    key: key.to_string(),
                })
            }
        }
    }

    /// Value at dotted `key`, or `default` when absent or unselected.
    /// Never logs.
    pub fn get_property_or(&self, key: &str, default: Value) -> Value {
        let path = PropertyPath::parse(key);
        let selection = self.selection.lock();
        if !selection.is_selected() {
            return default;
        }
        read_path(&selection.tree, &path)
            .cloned()
            .unwrap_or(default)
    }

    /// Whether dotted `key` resolves in the selected profile.
    pub fn has_property(&self, key: &str) -> bool {
        let path = PropertyPath::parse(key);
        let selection = self.selection.lock();
        selection.is_selected() && read_path(&selection.tree, &path).is_some()
    }

    /// Store `value` at dotted `key`, creating intermediate objects.
    ///
    /// Emits `SavesChanged` with the previous value (`Null` if absent) and
    /// returns `value`. Nothing is written to disk until [`Self::save`].
    pub fn set_property(&self, key: &str, value: Value) -> Result<Value, SaveError> {
        let path = PropertyPath::parse(key);
        let old_value = {
            let mut selection = self.selection.lock();
            if !selection.is_selected() {
                log::warn!("set_property('{}'): no profile selected", key);
                return Err(SaveError::NoProfileSelected);
            }
            let old_value = read_path(&selection.tree, &path)
                .cloned()
                .unwrap_or(Value::Null);
            write_path_creating(&mut selection.tree, &path, value.clone());
            old_value
        };

        log::debug!("Set property '{}'", path);
        self.notifier.emit(SaveEvent::SavesChanged {
            key: key.to_string(),
            old_value,
            new_value: value.clone(),
        });
        Ok(value)
    }

    /// Remove the value at dotted `key`, returning it.
    ///
    /// Emits `SavesChanged` with a `Null` new value.
    pub fn remove_property(&self, key: &str) -> Result<Value, SaveError> {
        let path = PropertyPath::parse(key);
        let removed = {
            let mut selection = self.selection.lock();
            if !selection.is_selected() {
                log::warn!("remove_property('{}'): no profile selected", key);
                return Err(SaveError::NoProfileSelected);
            }
            remove_path(&mut selection.tree, &path)
        };

        let Some(old_value) = removed else {
            log::warn!("Cannot remove '{}': property not found", key);
            return Err(SaveError::PathNotFound {
                key: key.to_string(),
            });
        };
        self.notifier.emit(SaveEvent::SavesChanged {
            key: key.to_string(),
            old_value: old_value.clone(),
            new_value: Value::Null,
        });
        Ok(old_value)
    }

    /// Load profile `name` and make it current.
    ///
    /// On any failure the previous selection is kept. An empty file loads
    /// as an empty document. An undecodable file is handled per
    /// [`DecodePolicy`]. Emits `ProfileChanged` on success.
    pub fn select_profile(&self, name: &str) -> Result<(), SaveError> {
        let name = name.trim();
        let Some(path) = self.catalog.lookup(name) else {
            log::warn!("Cannot select profile '{}': not found", name);
            return Err(SaveError::FileNotFound {
                path: self.catalog.config().profile_path(name),
            });
        };

        let bytes = match self.store.read_all(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Failed to read profile '{}': {}", name, e);
                return Err(e.into());
            }
        };

        let tree = match decode_document(&bytes) {
            Ok(tree) => tree,
            Err(source) => {
                log::error!("Failed to decode profile '{}': {}", name, source);
                match self.catalog.config().decode_policy {
                    DecodePolicy::Lenient => DocumentTree::new(),
                    DecodePolicy::Strict => {
                        return Err(SaveError::DecodeError {
                            name: name.to_string(),
                            source,
                        });
                    }
                }
            }
        };

        let old_name = {
            let mut selection = self.selection.lock();
            selection.tree = tree;
            std::mem::replace(&mut selection.name, name.to_string())
        };

        log::info!("Selected profile '{}' (was '{}')", name, old_name);
        self.notifier.emit(SaveEvent::ProfileChanged {
            old_name,
            new_name: name.to_string(),
        });
        Ok(())
    }

    /// Create a profile file. See [`ProfileCatalog::create`].
    pub fn create_profile(&self, name: &str, seed: &DocumentTree) -> Result<(), SaveError> {
        self.catalog.create(name, seed)
    }

    pub fn profile_exists(&self, name: &str) -> bool {
        self.catalog.exists(name.trim())
    }

    /// Names of all cataloged profiles, sorted.
    pub fn profile_names(&self) -> Vec<String> {
        self.catalog.names()
    }

    /// Write the selected profile to disk in the background.
    ///
    /// Returns `Err(CantResolve)` immediately when nothing is selected.
    /// Otherwise returns `Ok` at once; the outcome arrives as
    /// `ProfileSaved` or `ProfileSaveFailed`. A call made while a save is
    /// in flight queues one follow-up write of the newest snapshot.
    pub fn save(&self) -> Result<(), SaveError> {
        let snapshot = {
            let selection = self.selection.lock();
            if !selection.is_selected() {
                log::warn!("save: no profile selected");
                return Err(SaveError::CantResolve);
            }
            encode_pretty(&selection.tree)
                .map(|text| SaveTask {
                    profile_name: selection.name.clone(),
                    bytes: text.into_bytes(),
                })
                .map_err(|source| SaveError::DecodeError {
                    name: selection.name.clone(),
                    source,
                })
        };

        match snapshot {
            Ok(task) => self.saver.dispatch(task),
            Err(e) => self.saver.report_failure(&e),
        }
        Ok(())
    }

    pub fn is_saving(&self) -> bool {
        self.saver.is_saving()
    }

    /// Block until the background worker (and anything it queued) is done.
    pub fn wait_for_save(&self) {
        self.saver.wait_idle();
    }
}
