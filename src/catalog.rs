//! Discovery and creation of profile files.
//!
//! A profile named `alpha` lives at `{save_dir}/alpha.{extension}`. The
//! catalog is stateless: every query re-lists the save directory, so files
//! added or removed behind its back are picked up on the next call.

use crate::config::SaveConfig;
use crate::error::SaveError;
use crate::events::{Notifier, SaveEvent};
use crate::store::FileStore;
use par_saves_document::{DocumentTree, encode_pretty};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;

/// Maps profile names to files in the save directory.
pub struct ProfileCatalog {
    config: SaveConfig,
    store: Arc<dyn FileStore>,
    notifier: Arc<Notifier>,
}

impl std::fmt::Debug for ProfileCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCatalog")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProfileCatalog {
    pub fn new(config: SaveConfig, store: Arc<dyn FileStore>, notifier: Arc<Notifier>) -> Self {
        Self {
            config,
            store,
            notifier,
        }
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    /// Full paths of every profile file in the save directory.
    ///
    /// Creates the directory on first use. Failures are logged and yield an
    /// empty list. Order is whatever the store enumerates.
    pub fn list_save_files(&self) -> Vec<PathBuf> {
        let dir = &self.config.save_dir;
        if !self.store.is_dir(dir) {
            log::info!("Creating save directory {:?}", dir);
            if let Err(e) = self.store.create_dir_all(dir) {
                log::error!("Failed to create save directory {:?}: {}", dir, e);
                return Vec::new();
            }
        }

        let entries = match self.store.list_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("Failed to list save directory {:?}: {}", dir, e);
                return Vec::new();
            }
        };

        let extension = OsStr::new(&self.config.extension);
        entries
            .into_iter()
            .filter(|path| path.extension() == Some(extension))
            .collect()
    }

    /// Profile names mapped to their files.
    pub fn list_named_saves(&self) -> HashMap<String, PathBuf> {
        let mut named = HashMap::new();
        for path in self.list_save_files() {
            let Some(name) = path.file_stem().and_then(OsStr::to_str) else {
                log::warn!("Skipping save file with non UTF-8 name: {:?}", path);
                continue;
            };
            named.insert(name.to_string(), path);
        }
        named
    }

    /// All profile names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.list_named_saves().into_keys().collect();
        names.sort();
        names
    }

    pub fn exists(&self, name: &str) -> bool {
        self.list_named_saves().contains_key(name)
    }

    /// File backing `name`, if the profile is cataloged.
    pub fn lookup(&self, name: &str) -> Option<PathBuf> {
        self.list_named_saves().remove(name)
    }

    /// Create profile `name` seeded with `seed`.
    ///
    /// Emits `ProfileCreated`, and also `ProfileSaved` when `seed` is not
    /// empty. An existing profile is never touched.
    pub fn create(&self, name: &str, seed: &DocumentTree) -> Result<(), SaveError> {
        let name = name.trim();
        validate_name(name)?;

        if self.exists(name) {
            log::warn!("Profile '{}' already exists", name);
            return Err(SaveError::AlreadyExists {
                name: name.to_string(),
            });
        }

        let path = self.config.profile_path(name);
        let text = encode_pretty(seed).map_err(|source| SaveError::DecodeError {
            name: name.to_string(),
            source,
        })?;
        if let Err(e) = self.store.write_all(&path, text.as_bytes()) {
            log::error!("Failed to create profile '{}': {}", name, e);
            return Err(e.into());
        }

        log::info!("Created profile '{}' at {:?}", name, path);
        self.notifier.emit(SaveEvent::ProfileCreated {
            name: name.to_string(),
        });
        if !seed.is_empty() {
            self.notifier.emit(SaveEvent::ProfileSaved {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

/// Reject names that cannot map to a single file in the save directory.
fn validate_name(name: &str) -> Result<(), SaveError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        log::warn!("Rejected invalid profile name {:?}", name);
        return Err(SaveError::InvalidName(name.to_string()));
    }
    Ok(())
}
