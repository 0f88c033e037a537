//! Label-driven version bump planning and execution.
//!
//! All orchestration logic lives here. The CLI is purely a display layer.
//!
//! # Two-phase workflow
//!
//! 1. **Plan** ([`plan_bump`]) reads the local version, finds the reference
//!    version (reference branch or latest tag), picks the bump level from
//!    the pull request labels and computes the next version.
//! 2. **Execute** ([`BumpPlan::execute`]) splices the new version into the
//!    manifest, saves it, optionally commits it and renders the comment.
//!
//! The next version is always derived from the reference, not the local
//! file, so re-running on a pull request that was already bumped is a no-op.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::HandlerError;
use crate::handler::{self, FileHandler};
use crate::labels::{LabelError, LabelSet};
use crate::remote::{ContentSink, ContentSource, RemoteError};
use crate::version::{BumpLevel, ReleaseVersion, VersionError};

/// Placeholder for the previous version in message templates.
pub const OLD_PLACEHOLDER: &str = "{old}";

/// Placeholder for the new version in message templates.
pub const NEW_PLACEHOLDER: &str = "{new}";

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from bump operations.
#[derive(Error, Debug)]
pub enum BumpError {
    /// No manifest configured.
    #[error("no target file configured (set `target.file` or pass --file)")]
    NoTargetFile,

    /// Reading or editing the manifest failed.
    #[error("{file}: {source}")]
    Handler {
        /// The manifest involved.
        file: Utf8PathBuf,
        /// What went wrong.
        #[source]
        source: HandlerError,
    },

    /// A version could not be parsed or bumped.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// The labels do not select exactly one bump level.
    #[error(transparent)]
    Labels(#[from] LabelError),

    /// Fetching the reference or persisting the commit failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl BumpError {
    /// The message to post back on the pull request, for failures the
    /// author can fix by relabeling.
    pub fn comment_body(&self) -> Option<String> {
        match self {
            Self::Labels(err) => Some(err.to_string()),
            _ => None,
        }
    }

    fn handler(file: &Utf8Path) -> impl FnOnce(HandlerError) -> Self + '_ {
        move |source| Self::Handler {
            file: file.to_path_buf(),
            source,
        }
    }
}

/// Result alias for bump operations.
pub type BumpResult<T> = Result<T, BumpError>;

// ──────────────────────────────────────────────
// Plan
// ──────────────────────────────────────────────

/// A fully resolved bump, ready to execute.
#[derive(Debug, Clone)]
pub struct BumpPlan {
    /// Manifest path as configured (relative to the project root).
    pub file: Utf8PathBuf,
    /// Dotted key path of the version.
    pub key: String,
    /// Version currently in the local manifest.
    pub local: ReleaseVersion,
    /// Version at the reference, or `None` when it fell back to local.
    pub reference: Option<ReleaseVersion>,
    /// Level chosen from the labels.
    pub level: BumpLevel,
    /// The version the manifest should end up with.
    pub next: ReleaseVersion,
    local_text: String,
    handler: FileHandler,
    messages: Messages,
}

#[derive(Debug, Clone)]
struct Messages {
    commit: Option<String>,
    comment: Option<String>,
}

impl BumpPlan {
    /// Whether executing would change the manifest.
    ///
    /// Compares against the text as written, so `1.2` bumped to `1.2.0`
    /// counts as a change.
    pub fn has_changed(&self) -> bool {
        self.next.to_string() != self.local_text
    }
}

/// Plan a bump for the manifest configured in `config`.
///
/// # Arguments
/// * `project_root` - directory the target file is relative to
/// * `config` - loaded configuration
/// * `labels` - label names on the pull request
/// * `source` - where the reference version is read from
#[instrument(skip(config, labels, source))]
pub fn plan_bump<S: AsRef<str>>(
    project_root: &Utf8Path,
    config: &Config,
    labels: &[S],
    source: &dyn ContentSource,
) -> BumpResult<BumpPlan> {
    let file = config.target_file().ok_or(BumpError::NoTargetFile)?.to_path_buf();
    let key = config.target_key().to_string();

    let handler = handler::from_path(&project_root.join(&file)).map_err(BumpError::handler(&file))?;
    let local_text = handler.get(&key).map_err(BumpError::handler(&file))?;
    let local = ReleaseVersion::parse(&local_text)?;
    debug!(%local, "local version parsed");

    let level = LabelSet::from_config(config).decide(labels)?;

    let reference = reference_version(config, &file, &key, source)?;
    let base = match reference {
        Some(ref reference) => {
            debug!(%reference, "reference version parsed");
            reference
        }
        None => {
            info!("reference version not found, using the local one");
            &local
        }
    };

    let mut next = base.bump(level)?;
    next.v_prefix = local.v_prefix;
    info!(%local, %next, %level, "planned bump");

    let messages = Messages {
        commit: config
            .commit_enabled()
            .then(|| config.commit_message().to_string()),
        comment: config
            .comment_enabled()
            .then(|| config.comment_message().to_string()),
    };

    Ok(BumpPlan {
        file,
        key,
        local,
        reference,
        level,
        next,
        local_text,
        handler,
        messages,
    })
}

/// The version at the reference branch or latest tag.
///
/// A missing reference, file or key yields `None`; anything else is an
/// error.
fn reference_version(
    config: &Config,
    file: &Utf8Path,
    key: &str,
    source: &dyn ContentSource,
) -> BumpResult<Option<ReleaseVersion>> {
    if config.use_tag() {
        debug!("reading reference version from tags");
        return match source.latest_tag()? {
            Some(tag) => Ok(Some(ReleaseVersion::parse(&tag)?)),
            None => Ok(None),
        };
    }

    let branch = config.reference_branch();
    debug!(%branch, "reading reference version from branch");
    let text = match source.fetch(file, branch) {
        Ok(text) => text,
        Err(RemoteError::NotFound { .. }) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let found = handler::from_content(file.as_str(), text).and_then(|h| h.get(key));
    match found {
        Ok(value) => Ok(Some(ReleaseVersion::parse(&value)?)),
        Err(HandlerError::NotFound { what }) => {
            debug!(%what, "reference manifest has no version");
            Ok(None)
        }
        Err(source) => Err(BumpError::Handler {
            file: file.to_path_buf(),
            source,
        }),
    }
}

// ──────────────────────────────────────────────
// Execute
// ──────────────────────────────────────────────

/// Runtime switches for [`BumpPlan::execute`].
#[derive(Debug, Clone, Default)]
pub struct BumpOptions {
    /// Compute everything but leave the file and repository alone.
    pub dry_run: bool,
    /// Branch the commit goes to; commits are skipped without one.
    pub head_ref: Option<String>,
}

/// Result of a bump, in the shape CI steps consume.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BumpOutcome {
    /// Version before the bump.
    pub previous: String,
    /// Version after the bump.
    pub version: String,
    /// Whether the manifest changed.
    pub has_changed: bool,
    /// Level chosen from the labels.
    pub level: BumpLevel,
    /// Manifest path.
    pub file: Utf8PathBuf,
    /// Key path of the version.
    pub key: String,
    /// Identifier of the commit, when one was made.
    pub commit: Option<String>,
    /// Comment body to post, when comments are enabled.
    pub comment: Option<String>,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl BumpPlan {
    /// Apply the plan.
    #[instrument(skip(self, sink), fields(file = %self.file, next = %self.next))]
    pub fn execute(
        mut self,
        project_root: &Utf8Path,
        options: &BumpOptions,
        sink: Option<&mut dyn ContentSink>,
    ) -> BumpResult<BumpOutcome> {
        let previous = self.local_text.clone();
        let version = self.next.to_string();
        let mut outcome = BumpOutcome {
            previous: previous.clone(),
            version: version.clone(),
            has_changed: false,
            level: self.level,
            file: self.file.clone(),
            key: self.key.clone(),
            commit: None,
            comment: None,
            dry_run: options.dry_run,
        };

        if !self.has_changed() {
            info!(%version, "version already updated, skipping");
            return Ok(outcome);
        }
        outcome.has_changed = true;

        self.handler
            .set(&self.key, &version)
            .map_err(BumpError::handler(&self.file))?;

        if options.dry_run {
            info!(%previous, %version, "dry run, manifest left untouched");
        } else {
            self.handler
                .save(&project_root.join(&self.file))
                .map_err(BumpError::handler(&self.file))?;
            info!(%previous, %version, file = %self.file, "manifest updated");

            if let Some(ref template) = self.messages.commit {
                outcome.commit = self.commit(template, &previous, &version, options, sink)?;
            }
        }

        outcome.comment = self
            .messages
            .comment
            .as_deref()
            .map(|template| render_message(template, &previous, &version));

        Ok(outcome)
    }

    fn commit(
        &self,
        template: &str,
        previous: &str,
        version: &str,
        options: &BumpOptions,
        sink: Option<&mut dyn ContentSink>,
    ) -> BumpResult<Option<String>> {
        let (Some(head), Some(sink)) = (options.head_ref.as_deref(), sink) else {
            warn!("commit requested but no head branch or sink available, skipping");
            return Ok(None);
        };
        let message = render_message(template, previous, version);
        let id = sink.persist(&self.file, head, self.handler.content(), &message)?;
        Ok(Some(id))
    }
}

/// Replace every `{old}` and `{new}` in `template`.
pub fn render_message(template: &str, old: &str, new: &str) -> String {
    template
        .replace(OLD_PLACEHOLDER, old)
        .replace(NEW_PLACEHOLDER, new)
}
