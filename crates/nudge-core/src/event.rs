//! Pull request webhook payloads.
//!
//! CI runners hand the triggering event to the job as a JSON file (for
//! GitHub Actions, the file named by `GITHUB_EVENT_PATH`). Only the handful
//! of fields a bump needs are read.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from reading an event payload.
#[derive(Error, Debug)]
pub enum EventError {
    /// The payload file could not be read.
    #[error("{path}: {source}")]
    Io {
        /// Path of the payload.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The payload is not a pull request event.
    #[error("{path} is not a pull request event: {source}")]
    Parse {
        /// Path of the payload.
        path: Utf8PathBuf,
        /// Why deserialization failed.
        #[source]
        source: serde_json::Error,
    },
}

/// Result alias for event operations.
pub type EventResult<T> = Result<T, EventError>;

/// The parts of a `pull_request` event a bump cares about.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PullRequestEvent {
    /// The pull request itself.
    pub pull_request: PullRequest,
}

/// Pull request fields.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PullRequest {
    /// Pull request number.
    pub number: u64,
    /// Labels attached to the pull request.
    #[serde(default)]
    pub labels: Vec<Label>,
    /// The branch being merged.
    pub head: BranchRef,
}

/// A label on a pull request.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Label {
    /// Label name.
    pub name: String,
}

/// A branch reference.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BranchRef {
    /// Branch name, without `refs/heads/`.
    #[serde(rename = "ref")]
    pub name: String,
}

impl PullRequestEvent {
    /// Read and parse an event payload file.
    #[instrument]
    pub fn from_path(path: &Utf8Path) -> EventResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EventError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let event: Self = serde_json::from_str(&text).map_err(|source| EventError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            number = event.pull_request.number,
            labels = event.pull_request.labels.len(),
            "read pull request event"
        );
        Ok(event)
    }

    /// Names of all labels on the pull request.
    pub fn label_names(&self) -> Vec<String> {
        self.pull_request
            .labels
            .iter()
            .map(|label| label.name.clone())
            .collect()
    }

    /// The head branch name.
    pub fn head_ref(&self) -> &str {
        &self.pull_request.head.name
    }

    /// The pull request number.
    pub const fn number(&self) -> u64 {
        self.pull_request.number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAYLOAD: &str = r#"{
  "action": "labeled",
  "number": 42,
  "pull_request": {
    "number": 42,
    "title": "Add dark mode",
    "labels": [
      { "id": 1, "name": "enhancement", "color": "a2eeef" },
      { "id": 2, "name": "minor", "color": "ededed" }
    ],
    "head": { "ref": "feature/dark-mode", "sha": "0123abcd" },
    "base": { "ref": "main", "sha": "4567ef01" }
  },
  "repository": { "full_name": "acme/widgets" }
}"#;

    fn write(content: &str) -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("event.json")).unwrap();
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn reads_labels_head_and_number() {
        let (_tmp, path) = write(PAYLOAD);
        let event = PullRequestEvent::from_path(&path).unwrap();
        assert_eq!(event.label_names(), ["enhancement", "minor"]);
        assert_eq!(event.head_ref(), "feature/dark-mode");
        assert_eq!(event.number(), 42);
    }

    #[test]
    fn labels_default_to_empty() {
        let (_tmp, path) =
            write(r#"{ "pull_request": { "number": 1, "head": { "ref": "fix" } } }"#);
        let event = PullRequestEvent::from_path(&path).unwrap();
        assert!(event.label_names().is_empty());
    }

    #[test]
    fn push_event_is_rejected() {
        let (_tmp, path) = write(r#"{ "ref": "refs/heads/main", "commits": [] }"#);
        assert!(matches!(
            PullRequestEvent::from_path(&path),
            Err(EventError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("absent.json")).unwrap();
        assert!(matches!(
            PullRequestEvent::from_path(&path),
            Err(EventError::Io { .. })
        ));
    }
}
