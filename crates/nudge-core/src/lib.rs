//! Core library for nudge.
//!
//! This crate provides format-preserving edits of version strings in
//! manifest files, plus the label-driven bump workflow built on top of them.
//! The `nudge` CLI is a thin display layer over it.
//!
//! # Modules
//!
//! - [`bump`] - Plan and execute a label-driven version bump
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//! - [`event`] - Pull request event payloads
//! - [`git`] - Git plumbing for reference versions and commits
//! - [`handler`] - Read and rewrite one value in JSON, YAML and podspec files
//! - [`key_path`] - Dotted key paths
//! - [`labels`] - Mapping pull request labels to bump levels
//! - [`remote`] - Content sources and sinks for reference versions
//! - [`version`] - Release versions and bump arithmetic
//!
//! # Quick Start
//!
//! ```no_run
//! use nudge_core::{ConfigLoader, handler};
//! use camino::Utf8Path;
//!
//! let config = ConfigLoader::new()
//!     .with_user_config(true)
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! let file = handler::from_path(Utf8Path::new("package.json")).expect("readable manifest");
//! println!("{}", file.get(config.target_key()).expect("version present"));
//! ```
#![deny(unsafe_code)]

pub mod bump;

pub mod config;

pub mod error;

pub mod event;

pub mod git;

pub mod handler;

pub mod key_path;

pub mod labels;

pub mod remote;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult, HandlerError, HandlerResult};

pub use handler::{FileFormat, FileHandler};

pub use key_path::KeyPath;

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
