//! Error types for nudge-core

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// Configuration file not found after searching all locations.
    #[error("no configuration file found")]
    NotFound,
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors from key paths, matchers and file handlers.
///
/// Every variant is a deterministic failure: retrying against the same
/// buffer yields the same error, and a failed `set` never leaves a partial
/// edit behind.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The dotted key path is empty or has an empty segment.
    #[error("invalid key path `{path}`: {reason}")]
    InvalidKeyPath {
        /// The rejected input.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Nothing in the document matches (a key path, or the podspec block header).
    #[error("{what} not found")]
    NotFound {
        /// Description of what was looked up.
        what: String,
    },

    /// The file name has no extension the factory knows how to handle.
    #[error("{name} isn't a type of file that is supported (expected .json, .yaml, .yml or .podspec)")]
    UnsupportedFormat {
        /// The file name or path that was dispatched on.
        name: String,
    },

    /// The file could not be read or written.
    #[error("{path}: {source}")]
    Io {
        /// Path of the file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The replacement value would break out of its scalar.
    #[error("value `{value}` cannot be written in place: {reason}")]
    InvalidValue {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A lookup pattern could not be compiled.
    #[error("failed to build lookup pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl HandlerError {
    pub(crate) fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound {
            what: what.to_string(),
        }
    }
}

/// Result type alias using [`HandlerError`].
pub type HandlerResult<T> = Result<T, HandlerError>;
