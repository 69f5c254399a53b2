//! Dotted property path parsing.
//!
//! Keys like `" app . window size "` resolve to the segments
//! `["app", "window_size"]`: the whole key is trimmed, split on `.`, and each
//! piece is trimmed with inner spaces replaced by underscores.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// An ordered list of path segments derived from a dotted key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    /// Parse a dotted key. Never fails.
    ///
    /// An empty (or all-whitespace) key yields a single empty segment, so it
    /// addresses the `""` key at the document root.
    pub fn parse(key: &str) -> Self {
        let segments = key
            .trim()
            .split('.')
            .map(|piece| piece.trim().replace(' ', "_"))
            .collect();
        Self { segments }
    }

    /// The normalized segments, root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments (always at least one).
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: parsing yields at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Split into the parent segments and the final segment.
    pub fn split_last(&self) -> (&[String], &str) {
        match self.segments.split_last() {
            Some((last, parents)) => (parents, last.as_str()),
            None => (&[], ""),
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for PropertyPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for PropertyPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
