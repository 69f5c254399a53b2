//! Document model for par-saves profiles.
//!
//! A profile is a nested JSON object addressed by dotted keys such as
//! `app.window.width`. This crate provides:
//!
//! - [`PropertyPath`]: dotted key parsing and segment normalization
//! - [`tree`]: read and write-with-creation traversal over a [`DocumentTree`]
//! - [`codec`]: the on-disk JSON format (tab-indented, sorted keys)

pub mod codec;
pub mod error;
pub mod path;
pub mod tree;

pub use codec::{decode_document, encode_pretty};
pub use error::CodecError;
pub use path::PropertyPath;
pub use tree::{read_path, remove_path, write_path_creating};

/// A single JSON-compatible value stored in a profile.
pub type Value = serde_json::Value;

/// The root of one profile: string keys mapped to [`Value`]s.
///
/// Iteration order follows `serde_json`'s features; [`encode_pretty`] sorts
/// keys itself.
pub type DocumentTree = serde_json::Map<String, Value>;
