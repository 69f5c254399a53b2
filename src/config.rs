//! Save location and format settings.
//!
//! Settings can be built in code or loaded from a YAML file:
//!
//! ```yaml
//! save_dir: /home/user/.local/share/my-game/saves
//! extension: sav
//! decode_policy: strict
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension used for profile files unless configured otherwise.
pub const DEFAULT_SAVE_EXTENSION: &str = "save";

/// Extension used by the older on-disk layout. Select it with
/// [`SaveConfig::with_extension`] to read profiles written by that revision.
pub const LEGACY_SAVE_EXTENSION: &str = "sav";

/// What to do when a profile file exists but cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Report the error and select the profile with an empty document.
    #[default]
    Lenient,
    /// Report the error and refuse the selection, keeping the prior profile.
    Strict,
}

/// Where profiles live and how they are named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Directory holding one file per profile. Created on first listing.
    pub save_dir: PathBuf,
    /// File extension (without the dot) identifying profile files.
    pub extension: String,
    /// Behavior on undecodable profile files.
    pub decode_policy: DecodePolicy,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            save_dir: Self::default_save_dir(),
            extension: DEFAULT_SAVE_EXTENSION.to_string(),
            decode_policy: DecodePolicy::default(),
        }
    }
}

impl SaveConfig {
    /// Config rooted at `save_dir` with default extension and policy.
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self::default().with_save_dir(save_dir)
    }

    /// Application-local writable save directory.
    ///
    /// `~/.local/share/par-saves/saves` on Linux, the platform equivalent
    /// elsewhere, or `./saves` when no data directory is known.
    pub fn default_save_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join("par-saves").join("saves"))
            .unwrap_or_else(|| PathBuf::from("saves"))
    }

    pub fn with_save_dir(mut self, save_dir: impl Into<PathBuf>) -> Self {
        self.save_dir = save_dir.into();
        self
    }

    /// Set the profile file extension. A leading `.` is ignored.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = normalize_extension(extension);
        self
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    /// Location of the file backing profile `name`.
    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.save_dir.join(format!("{}.{}", name, self.extension))
    }

    /// Load settings from a YAML file.
    ///
    /// A missing or empty file yields [`SaveConfig::default`].
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No save config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read save config from {:?}", path))?;

        if contents.trim().is_empty() {
            log::info!("Save config {:?} is empty, using defaults", path);
            return Ok(Self::default());
        }

        let mut config: SaveConfig = serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("Failed to parse save config from {:?}", path))?;
        config.extension = normalize_extension(&config.extension);

        log::debug!(
            "Loaded save config: dir={:?} extension={} policy={:?}",
            config.save_dir,
            config.extension,
            config.decode_policy
        );
        Ok(config)
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_string()
}
