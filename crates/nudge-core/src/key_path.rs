//! Dotted key paths such as `double.nested.token`.
//!
//! A key path addresses one scalar leaf. There is no escaping mechanism, so
//! a segment can never contain a literal dot.

use std::fmt;
use std::str::FromStr;

use crate::error::{HandlerError, HandlerResult};

/// An ordered, non-empty list of non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Split a dotted string into segments.
    ///
    /// Fails with [`HandlerError::InvalidKeyPath`] when the input is empty or
    /// any segment is empty (`"a..b"`, `".a"`, `"a."`).
    pub fn parse(dotted: &str) -> HandlerResult<Self> {
        if dotted.is_empty() {
            return Err(HandlerError::InvalidKeyPath {
                path: dotted.to_string(),
                reason: "key path is empty",
            });
        }

        let segments: Vec<String> = dotted.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(HandlerError::InvalidKeyPath {
                path: dotted.to_string(),
                reason: "key path contains an empty segment",
            });
        }

        Ok(Self { segments })
    }

    /// All segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment, naming the scalar itself.
    pub fn leaf(&self) -> &str {
        // parse() guarantees at least one segment
        self.segments.last().map_or("", String::as_str)
    }

    /// Every segment except the leaf.
    pub fn parents(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    /// Number of segments (always at least one).
    pub const fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub const fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromStr for KeyPath {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
