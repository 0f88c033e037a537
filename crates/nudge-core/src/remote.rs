//! Where reference versions come from and where bumps are persisted.
//!
//! The bump workflow only talks to these traits, so the git-backed
//! [`GitRemote`] can be swapped for a hosted-API client or an in-memory
//! double in tests.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::git::{self, GitError, Identity};
use crate::version::ReleaseVersion;

/// Errors from content sources and sinks.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The reference, or the file at that reference, does not exist.
    #[error("{path} not found at {reference}")]
    NotFound {
        /// Path of the requested file.
        path: Utf8PathBuf,
        /// Branch, tag or commit it was requested at.
        reference: String,
    },

    /// A commit was requested for a branch that is not checked out.
    #[error("cannot commit to {expected}: the checked-out branch is {actual}")]
    BranchMismatch {
        /// Branch the commit should land on.
        expected: String,
        /// Branch that is checked out (`HEAD` when detached).
        actual: String,
    },

    /// A git operation failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Writing the file before committing failed.
    #[error("{path}: {source}")]
    Io {
        /// Path of the file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Reads files as they exist at some reference.
pub trait ContentSource {
    /// Raw text of `path` at `reference`.
    ///
    /// A missing reference or file must be reported as
    /// [`RemoteError::NotFound`]; callers treat it as "no reference version".
    fn fetch(&self, path: &Utf8Path, reference: &str) -> RemoteResult<String>;

    /// The newest tag that reads as a version, if any.
    fn latest_tag(&self) -> RemoteResult<Option<String>>;
}

/// Persists edited files.
pub trait ContentSink {
    /// Store `content` as `path` on branch `reference` with `message`,
    /// returning an identifier for the stored revision.
    fn persist(
        &mut self,
        path: &Utf8Path,
        reference: &str,
        content: &str,
        message: &str,
    ) -> RemoteResult<String>;
}

/// [`ContentSource`] and [`ContentSink`] backed by a local clone.
#[derive(Debug, Clone)]
pub struct GitRemote {
    root: Utf8PathBuf,
    identity: Identity,
}

impl GitRemote {
    /// Operate on the repository containing `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            identity: Identity::default(),
        }
    }

    /// Commit as this identity instead of git's configured one.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// The repository directory.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl ContentSource for GitRemote {
    #[instrument(skip(self), fields(root = %self.root))]
    fn fetch(&self, path: &Utf8Path, reference: &str) -> RemoteResult<String> {
        match git::show_file(&self.root, reference, path) {
            Ok(content) => Ok(content),
            Err(GitError::Command { stderr, .. }) => {
                debug!(%stderr, "git show failed");
                Err(RemoteError::NotFound {
                    path: path.to_path_buf(),
                    reference: reference.to_string(),
                })
            }
            Err(GitError::NotARepo) => {
                debug!("not inside a repository, no reference available");
                Err(RemoteError::NotFound {
                    path: path.to_path_buf(),
                    reference: reference.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(root = %self.root))]
    fn latest_tag(&self) -> RemoteResult<Option<String>> {
        let tags = match git::tags_by_version(&self.root) {
            Ok(tags) => tags,
            Err(GitError::NotARepo) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let tag = tags
            .into_iter()
            .find(|tag| ReleaseVersion::parse(tag).is_ok());
        debug!(?tag, "latest version tag");
        Ok(tag)
    }
}

impl ContentSink for GitRemote {
    #[instrument(skip(self, content, message), fields(root = %self.root))]
    fn persist(
        &mut self,
        path: &Utf8Path,
        reference: &str,
        content: &str,
        message: &str,
    ) -> RemoteResult<String> {
        let actual = git::current_branch(&self.root)?.unwrap_or_else(|| "HEAD".to_string());
        if actual != reference {
            return Err(RemoteError::BranchMismatch {
                expected: reference.to_string(),
                actual,
            });
        }

        let full_path = self.root.join(path);
        std::fs::write(&full_path, content).map_err(|source| RemoteError::Io {
            path: full_path.clone(),
            source,
        })?;

        git::commit_file(&self.root, path, message, &self.identity)?;
        let commit = git::head_commit(&self.root)?;
        info!(%commit, %path, "committed version bump");
        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::tests::{init_repo, run};

    #[test]
    fn fetch_reads_reference_branch() {
        let (_tmp, root) = init_repo(&[("pubspec.yaml", "version: 1.0.0\n")]);
        let remote = GitRemote::new(&root);
        let text = remote.fetch(Utf8Path::new("pubspec.yaml"), "main").unwrap();
        assert_eq!(text, "version: 1.0.0\n");
    }

    #[test]
    fn fetch_missing_file_or_branch_is_not_found() {
        let (_tmp, root) = init_repo(&[("pubspec.yaml", "version: 1.0.0\n")]);
        let remote = GitRemote::new(&root);

        assert!(matches!(
            remote.fetch(Utf8Path::new("other.yaml"), "main"),
            Err(RemoteError::NotFound { .. })
        ));
        assert!(matches!(
            remote.fetch(Utf8Path::new("pubspec.yaml"), "no-such-branch"),
            Err(RemoteError::NotFound { .. })
        ));
    }

    #[test]
    fn outside_a_repository_nothing_is_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let remote = GitRemote::new(&root);

        assert!(matches!(
            remote.fetch(Utf8Path::new("package.json"), "main"),
            Err(RemoteError::NotFound { .. })
        ));
        assert_eq!(remote.latest_tag().unwrap(), None);
    }

    #[test]
    fn latest_tag_skips_non_version_tags() {
        let (_tmp, root) = init_repo(&[]);
        let remote = GitRemote::new(&root);
        assert_eq!(remote.latest_tag().unwrap(), None);

        run(&root, &["tag", "v1.2.0"]);
        run(&root, &["tag", "v1.3.0"]);
        run(&root, &["tag", "nightly"]);
        assert_eq!(remote.latest_tag().unwrap().as_deref(), Some("v1.3.0"));
    }

    #[test]
    fn persist_commits_on_the_checked_out_branch() {
        let (_tmp, root) = init_repo(&[("package.json", r#"{ "version": "1.0.0" }"#)]);
        let mut remote = GitRemote::new(&root).with_identity(Identity {
            name: Some("Bot".into()),
            email: Some("bot@example.com".into()),
        });

        let commit = remote
            .persist(
                Utf8Path::new("package.json"),
                "main",
                r#"{ "version": "1.1.0" }"#,
                "Bump version from 1.0.0 to 1.1.0",
            )
            .unwrap();

        assert_eq!(run(&root, &["rev-parse", "HEAD"]).trim(), commit);
        let committed = remote.fetch(Utf8Path::new("package.json"), "HEAD").unwrap();
        assert_eq!(committed, r#"{ "version": "1.1.0" }"#);
    }

    #[test]
    fn persist_refuses_other_branches() {
        let (_tmp, root) = init_repo(&[("package.json", "{}")]);
        let mut remote = GitRemote::new(&root);
        let err = remote
            .persist(Utf8Path::new("package.json"), "feature", "{}", "msg")
            .unwrap_err();
        assert!(matches!(
            err,
            RemoteError::BranchMismatch { ref expected, ref actual }
                if expected == "feature" && actual == "main"
        ));
    }
}
