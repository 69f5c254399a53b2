//! Per-profile application state persisted as JSON files.
//!
//! A save directory holds one file per profile. A [`ProfileSession`]
//! selects one profile at a time, exposes its contents through dotted keys,
//! and writes it back on a background thread. It includes:
//!
//! - Profile discovery and creation ([`ProfileCatalog`])
//! - Dotted-key get/set over the selected document ([`ProfileSession`])
//! - Single-flight background saves ([`SaveCoordinator`])
//! - Change notifications ([`SaveEvent`], [`SaveObserver`])
//! - Pluggable file access ([`FileStore`], [`FsStore`], [`MemoryStore`])
//!
//! ```rust,no_run
//! use par_saves::{DocumentTree, ProfileSession, SaveConfig};
//! use serde_json::json;
//!
//! let session = ProfileSession::open(SaveConfig::default());
//! if !session.profile_exists("alpha") {
//!     session.create_profile("alpha", &DocumentTree::new())?;
//! }
//! session.select_profile("alpha")?;
//! session.set_property("app.version", json!(2))?;
//! session.save()?;
//! session.wait_for_save();
//! # Ok::<(), par_saves::SaveError>(())
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod store;

pub use catalog::ProfileCatalog;
pub use config::{DEFAULT_SAVE_EXTENSION, DecodePolicy, LEGACY_SAVE_EXTENSION, SaveConfig};
pub use error::{ErrorCode, SaveError, StoreError};
pub use events::{EventRecorder, Notifier, SaveEvent, SaveObserver};
pub use session::ProfileSession;
pub use session::coordinator::{SaveCoordinator, SavePhase, SaveTask};
pub use store::{FileStore, FsStore, MemoryStore};

// Re-export the document model so callers need only this crate.
pub use par_saves_document::{DocumentTree, PropertyPath, Value};
