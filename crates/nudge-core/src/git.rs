//! Git plumbing for reading reference versions and committing bumps.
//!
//! Shells out to `git` for all operations. This ensures we inherit the user's
//! SSH keys, GPG signing, hooks, and other configuration. Every function runs
//! inside an explicit repository directory rather than the process's working
//! directory.

use std::process::Command;

use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "show").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Committer identity passed as `-c user.name=… -c user.email=…`.
///
/// Unset fields fall back to git's own configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// `user.name` override.
    pub name: Option<String>,
    /// `user.email` override.
    pub email: Option<String>,
}

impl Identity {
    fn config_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ref name) = self.name {
            args.extend(["-c".to_string(), format!("user.name={name}")]);
        }
        if let Some(ref email) = self.email {
            args.extend(["-c".to_string(), format!("user.email={email}")]);
        }
        args
    }
}

/// Check if `repo` is inside a git work tree.
#[instrument]
pub fn is_inside_repo(repo: &Utf8Path) -> GitResult<bool> {
    match git(repo, &["rev-parse", "--is-inside-work-tree"]) {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Get the current branch name.
///
/// Returns `None` if in a detached HEAD state.
#[instrument]
pub fn current_branch(repo: &Utf8Path) -> GitResult<Option<String>> {
    let output = git(repo, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let branch = output.trim().to_string();
    if branch == "HEAD" {
        debug!("detached HEAD");
        Ok(None)
    } else {
        debug!(%branch, "current branch");
        Ok(Some(branch))
    }
}

/// Read `path` (relative to `repo`) as it exists at `reference`.
///
/// Fails with [`GitError::Command`] when the reference or the file at that
/// reference does not exist.
#[instrument]
pub fn show_file(repo: &Utf8Path, reference: &str, path: &Utf8Path) -> GitResult<String> {
    let spec = format!("{reference}:./{path}");
    let content = git(repo, &["show", &spec])?;
    debug!(bytes = content.len(), "read file at reference");
    Ok(content)
}

/// All tags, highest version first.
#[instrument]
pub fn tags_by_version(repo: &Utf8Path) -> GitResult<Vec<String>> {
    let output = git(repo, &["tag", "--list", "--sort=-version:refname"])?;
    let tags: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    debug!(count = tags.len(), "listed tags");
    Ok(tags)
}

/// Stage `path` and commit only that path.
#[instrument(skip(message))]
pub fn commit_file(
    repo: &Utf8Path,
    path: &Utf8Path,
    message: &str,
    identity: &Identity,
) -> GitResult<()> {
    git(repo, &["add", "--", path.as_str()])?;

    let mut args = identity.config_args();
    args.extend(
        ["commit", "--quiet", "-m", message, "--", path.as_str()]
            .into_iter()
            .map(str::to_string),
    );
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    git(repo, &args)?;
    Ok(())
}

/// The full hash of `HEAD`.
#[instrument]
pub fn head_commit(repo: &Utf8Path) -> GitResult<String> {
    Ok(git(repo, &["rev-parse", "HEAD"])?.trim().to_string())
}

/// Run a git command in `repo` and return its stdout.
fn git(repo: &Utf8Path, args: &[&str]) -> GitResult<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo.as_std_path())
        .output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args
                .iter()
                .find(|arg| !arg.starts_with('-') && !arg.contains('='))
                .copied()
                .unwrap_or_default()
                .to_string(),
            stderr,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    /// A fresh repository on `main` with one commit containing `files`.
    pub(crate) fn init_repo(files: &[(&str, &str)]) -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        git(&root, &["init", "--quiet"]).unwrap();
        git(&root, &["symbolic-ref", "HEAD", "refs/heads/main"]).unwrap();
        git(&root, &["config", "user.name", "Test"]).unwrap();
        git(&root, &["config", "user.email", "test@example.com"]).unwrap();
        git(&root, &["config", "commit.gpgsign", "false"]).unwrap();
        git(&root, &["config", "tag.gpgsign", "false"]).unwrap();

        for (name, content) in files {
            std::fs::write(root.join(name), content).unwrap();
            git(&root, &["add", name]).unwrap();
        }
        git(&root, &["commit", "--quiet", "--allow-empty", "-m", "initial"]).unwrap();

        (tmp, root)
    }

    pub(crate) fn run(repo: &Utf8Path, args: &[&str]) -> String {
        git(repo, args).unwrap()
    }

    #[test]
    fn is_inside_repo_detects_both_cases() {
        let (_tmp, root) = init_repo(&[]);
        assert!(is_inside_repo(&root).unwrap());

        let outside = TempDir::new().unwrap();
        let outside = Utf8PathBuf::try_from(outside.path().to_path_buf()).unwrap();
        assert!(!is_inside_repo(&outside).unwrap_or(false));
    }

    #[test]
    fn current_branch_reports_main() {
        let (_tmp, root) = init_repo(&[]);
        assert_eq!(current_branch(&root).unwrap().as_deref(), Some("main"));
    }

    #[test]
    fn show_file_reads_committed_content() {
        let (_tmp, root) = init_repo(&[("package.json", r#"{ "version": "1.0.0" }"#)]);
        std::fs::write(root.join("package.json"), r#"{ "version": "9.9.9" }"#).unwrap();

        let content = show_file(&root, "main", Utf8Path::new("package.json")).unwrap();
        assert_eq!(content, r#"{ "version": "1.0.0" }"#);
    }

    #[test]
    fn show_file_missing_path_is_command_error() {
        let (_tmp, root) = init_repo(&[]);
        let err = show_file(&root, "main", Utf8Path::new("nope.json")).unwrap_err();
        assert!(matches!(err, GitError::Command { ref command, .. } if command == "show"));
    }

    #[test]
    fn tags_are_sorted_by_version() {
        let (_tmp, root) = init_repo(&[]);
        for tag in ["v1.2.0", "v1.10.0", "v1.9.3"] {
            run(&root, &["tag", tag]);
        }
        assert_eq!(tags_by_version(&root).unwrap(), ["v1.10.0", "v1.9.3", "v1.2.0"]);
    }

    #[test]
    fn commit_file_uses_identity() {
        let (_tmp, root) = init_repo(&[("pubspec.yaml", "version: 1.0.0\n")]);
        std::fs::write(root.join("pubspec.yaml"), "version: 1.0.1\n").unwrap();

        let identity = Identity {
            name: Some("Release Bot".into()),
            email: Some("bot@example.com".into()),
        };
        commit_file(&root, Utf8Path::new("pubspec.yaml"), "bump 1.0.1", &identity).unwrap();

        let log = run(&root, &["log", "-1", "--format=%cn <%ce> %s"]);
        assert_eq!(log.trim(), "Release Bot <bot@example.com> bump 1.0.1");
        assert_eq!(head_commit(&root).unwrap().len(), 40);
    }

    #[test]
    fn git_error_on_bad_command() {
        let (_tmp, root) = init_repo(&[]);
        assert!(git(&root, &["not-a-real-subcommand"]).is_err());
    }
}
