//! Typed errors for the document codec.

use thiserror::Error;

/// Errors produced while encoding or decoding a profile document.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The file contents were not valid UTF-8.
    #[error("Profile document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The contents could not be parsed as JSON.
    #[error("Profile document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON parsed, but the top-level value is not an object.
    #[error("Profile document must be a JSON object, found {found}")]
    NotAnObject {
        /// JSON type name of the top-level value.
        found: &'static str,
    },
}
