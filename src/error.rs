//! Typed error variants for par-saves.
//!
//! Every fallible operation returns a [`SaveError`]. Background saves never
//! return one to the caller; they report the matching [`ErrorCode`] through
//! [`crate::SaveEvent::ProfileSaveFailed`] instead.

use std::path::PathBuf;

use par_saves_document::CodecError;
use thiserror::Error;

/// Errors reported by the profile catalog, session, and save coordinator.
#[derive(Debug, Error)]
pub enum SaveError {
    /// A profile operation was attempted before any profile was selected.
    #[error("No profile is selected")]
    NoProfileSelected,

    /// A dotted key did not resolve to a value in the current profile.
    #[error("Property '{key}' not found in the current profile")]
    PathNotFound {
        /// The key as given by the caller.
        key: String,
    },

    /// `create` was called for a profile name that is already cataloged.
    #[error("Profile '{name}' already exists")]
    AlreadyExists {
        /// The conflicting profile name.
        name: String,
    },

    /// A profile file could not be opened for reading or writing.
    #[error("Cannot open '{}': {source}", .path.display())]
    CantOpen {
        /// File that could not be opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `save` was called with no profile selected, so there is nothing to
    /// resolve a target file from.
    #[error("Cannot resolve a save target: no profile is selected")]
    CantResolve,

    /// The file backing a profile does not exist.
    #[error("Profile file not found: {}", .path.display())]
    FileNotFound {
        /// Expected location of the file.
        path: PathBuf,
    },

    /// A profile file could not be decoded, or a document could not be
    /// encoded.
    #[error("Failed to decode profile '{name}': {source}")]
    DecodeError {
        /// Profile whose document failed to decode.
        name: String,
        /// Underlying codec error.
        #[source]
        source: CodecError,
    },

    /// The profile name is empty or contains path separators.
    #[error("Invalid profile name '{0}'")]
    InvalidName(String),
}

/// Cloneable discriminant of a [`SaveError`], carried by notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoProfileSelected,
    PathNotFound,
    AlreadyExists,
    CantOpen,
    CantResolve,
    FileNotFound,
    DecodeError,
    InvalidName,
}

impl SaveError {
    /// The code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SaveError::NoProfileSelected => ErrorCode::NoProfileSelected,
            SaveError::PathNotFound { .. } => ErrorCode::PathNotFound,
            SaveError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            SaveError::CantOpen { .. } => ErrorCode::CantOpen,
            SaveError::CantResolve => ErrorCode::CantResolve,
            SaveError::FileNotFound { .. } => ErrorCode::FileNotFound,
            SaveError::DecodeError { .. } => ErrorCode::DecodeError,
            SaveError::InvalidName(_) => ErrorCode::InvalidName,
        }
    }
}

/// Errors returned by a [`crate::FileStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The path does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The path exists (or should be creatable) but could not be opened.
    #[error("Cannot open '{}': {source}", .path.display())]
    CantOpen {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Classify an I/O error for `path`.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(path)
        } else {
            StoreError::CantOpen { path, source }
        }
    }
}

impl From<StoreError> for SaveError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(path) => SaveError::FileNotFound { path },
            StoreError::CantOpen { path, source } => SaveError::CantOpen { path, source },
        }
    }
}
