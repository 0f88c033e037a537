//! Configuration loading and discovery.
//!
//! Configuration is layered from, lowest precedence first:
//! 1. Built-in defaults
//! 2. `~/.config/nudge/config.<ext>` (user config)
//! 3. `.nudge.<ext>` or `nudge.<ext>` in the current directory or any parent
//!    up to the repository root
//! 4. Files passed explicitly (`--config`)
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use nudge_core::config::ConfigLoader;
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! ```
//!
//! A project config for an npm package that bumps on `semver:*` labels:
//!
//! ```toml
//! [target]
//! file = "package.json"
//!
//! [labels]
//! patch = "semver:patch"
//! minor = "semver:minor"
//! major = "semver:major"
//!
//! [commit]
//! enabled = true
//! message = "chore: release {new}"
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Key looked up when `target.key` is unset.
pub const DEFAULT_KEY: &str = "version";

/// Branch the reference version is read from when `reference.branch` is unset.
pub const DEFAULT_REFERENCE_BRANCH: &str = "main";

/// Commit message used when `commit.message` is unset.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Bump version from {old} to {new}";

/// Comment body used when `comment.message` is unset.
pub const DEFAULT_COMMENT_MESSAGE: &str = "Version bumped from {old} to {new}.";

/// The configuration for nudge.
///
/// Every section is optional. Unset values are resolved where they are used,
/// so a missing section and an empty one behave the same.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// The file and key holding the version.
    pub target: Option<TargetConfig>,
    /// Label names mapped to bump levels.
    pub labels: Option<LabelsConfig>,
    /// Where the reference version comes from.
    pub reference: Option<ReferenceConfig>,
    /// Pull request comment behavior.
    pub comment: Option<CommentConfig>,
    /// Commit behavior after a bump.
    pub commit: Option<CommitConfig>,
}

/// The manifest to edit.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TargetConfig {
    /// Path to the manifest, relative to the project root.
    pub file: Option<Utf8PathBuf>,
    /// Dotted key path of the version (default: `version`).
    pub key: Option<String>,
}

/// Label names that select each bump level.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LabelsConfig {
    /// Label for a patch bump (default: `patch`).
    pub patch: Option<String>,
    /// Label for a minor bump (default: `minor`).
    pub minor: Option<String>,
    /// Label for a major bump (default: `major`).
    pub major: Option<String>,
}

/// Reference version source.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReferenceConfig {
    /// Branch to read the manifest from (default: `main`).
    pub branch: Option<String>,
    /// Use the latest version tag instead of a branch (default: `false`).
    pub use_tag: Option<bool>,
}

/// Pull request comment settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommentConfig {
    /// Whether to produce a comment (default: `false`).
    pub enabled: Option<bool>,
    /// Comment template; `{old}` and `{new}` are replaced with the versions.
    pub message: Option<String>,
}

/// Commit settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommitConfig {
    /// Whether to commit the edited manifest (default: `false`).
    pub enabled: Option<bool>,
    /// Commit message template; `{old}` and `{new}` are replaced.
    pub message: Option<String>,
    /// Committer name (default: git's own configuration).
    pub username: Option<String>,
    /// Committer email (default: git's own configuration).
    pub email: Option<String>,
}

impl Config {
    /// The manifest path, if configured.
    pub fn target_file(&self) -> Option<&Utf8Path> {
        self.target.as_ref()?.file.as_deref()
    }

    /// The version key, or [`DEFAULT_KEY`].
    pub fn target_key(&self) -> &str {
        self.target
            .as_ref()
            .and_then(|t| t.key.as_deref())
            .unwrap_or(DEFAULT_KEY)
    }

    /// The reference branch, or [`DEFAULT_REFERENCE_BRANCH`].
    pub fn reference_branch(&self) -> &str {
        self.reference
            .as_ref()
            .and_then(|r| r.branch.as_deref())
            .unwrap_or(DEFAULT_REFERENCE_BRANCH)
    }

    /// Whether the reference version comes from the latest tag.
    pub fn use_tag(&self) -> bool {
        self.reference
            .as_ref()
            .and_then(|r| r.use_tag)
            .unwrap_or(false)
    }

    /// Whether comments are enabled.
    pub fn comment_enabled(&self) -> bool {
        self.comment
            .as_ref()
            .and_then(|c| c.enabled)
            .unwrap_or(false)
    }

    /// The comment template.
    pub fn comment_message(&self) -> &str {
        self.comment
            .as_ref()
            .and_then(|c| c.message.as_deref())
            .unwrap_or(DEFAULT_COMMENT_MESSAGE)
    }

    /// Whether commits are enabled.
    pub fn commit_enabled(&self) -> bool {
        self.commit.as_ref().and_then(|c| c.enabled).unwrap_or(false)
    }

    /// The commit message template.
    pub fn commit_message(&self) -> &str {
        self.commit
            .as_ref()
            .and_then(|c| c.message.as_deref())
            .unwrap_or(DEFAULT_COMMIT_MESSAGE)
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "nudge";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Starting directory for project config search.
    project_search_root: Option<Utf8PathBuf>,
    /// Whether to include user config from XDG directory.
    include_user_config: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    /// Explicit config files to load (for testing or programmatic use).
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Set the starting directory for project config search.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/nudge/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Stop the upward search at a directory containing `marker`
    /// (default `.git`).
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file. Later files take precedence.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration, merging all discovered sources.
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
        }

        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            figment = Self::merge_file(figment, &project_config);
        }

        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            target = ?config.target_file(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Load configuration, returning an error if no config file is found.
    pub fn load_or_error(self) -> ConfigResult<Config> {
        let has_user = self.include_user_config && self.find_user_config().is_some();
        let has_project = self
            .project_search_root
            .as_ref()
            .and_then(|root| self.find_project_config(root))
            .is_some();
        let has_explicit = !self.explicit_files.is_empty();

        if !has_user && !has_project && !has_explicit {
            return Err(ConfigError::NotFound);
        }

        self.load()
    }

    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            for ext in CONFIG_EXTENSIONS {
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }

                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }

            // The directory holding the marker is the last one searched.
            if let Some(ref marker) = self.boundary_marker
                && dir.join(marker).exists()
            {
                break;
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let config_dir = user_config_dir()?;
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| config_dir.join(format!("config.{ext}")))
            .find(|path| path.is_file())
    }

    /// Merge a config file into the figment, detecting format from extension.
    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Find the project config file path without loading it.
///
/// Uses the same `.git` boundary as [`ConfigLoader::load`], so the result is
/// the file a default load would merge.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new()
        .with_project_search(start.as_ref())
        .find_project_config(start.as_ref())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the user config directory path.
///
/// Returns `~/.config/nudge/` on Linux, `~/Library/Application Support/nudge/`
/// on macOS, and equivalent on other platforms.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}
