//! Bump command: thin CLI layer over `nudge_core::bump`.

use std::io::Write;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument, warn};

use nudge_core::bump::{self, BumpError, BumpOptions, BumpOutcome};
use nudge_core::config::{CommentConfig, CommitConfig, Config, ReferenceConfig, TargetConfig};
use nudge_core::event::PullRequestEvent;
use nudge_core::git::Identity;
use nudge_core::remote::GitRemote;

const ENV_EVENT_PATH: &str = "GITHUB_EVENT_PATH";
const ENV_OUTPUT: &str = "GITHUB_OUTPUT";

/// Arguments for the `bump` subcommand.
#[derive(Args, Debug, Default)]
pub struct BumpArgs {
    /// Pull request label (repeatable); overrides the event file
    #[arg(long = "label", value_name = "LABEL")]
    pub labels: Vec<String>,

    /// Pull request event payload to read labels and head branch from
    #[arg(long, value_name = "FILE")]
    pub event: Option<Utf8PathBuf>,

    /// Manifest holding the version (overrides `target.file`)
    #[arg(long, value_name = "FILE")]
    pub file: Option<Utf8PathBuf>,

    /// Dotted key path of the version (overrides `target.key`)
    #[arg(long)]
    pub key: Option<String>,

    /// Branch the reference version is read from (overrides `reference.branch`)
    #[arg(long, value_name = "BRANCH")]
    pub reference_branch: Option<String>,

    /// Read the reference version from the latest tag instead of a branch
    #[arg(long)]
    pub use_tag: bool,

    /// Branch to commit the bump to (defaults to the event's head branch)
    #[arg(long, value_name = "REF")]
    pub head: Option<String>,

    /// Commit the bumped manifest
    #[arg(long)]
    pub commit: bool,

    /// Produce a pull request comment describing the bump
    #[arg(long)]
    pub comment: bool,

    /// Run without making changes (show what would happen)
    #[arg(long)]
    pub dry_run: bool,
}

impl BumpArgs {
    /// Layer the command-line overrides on top of the loaded config.
    fn apply_to(&self, config: &mut Config) {
        if self.file.is_some() || self.key.is_some() {
            let target = config.target.get_or_insert_with(TargetConfig::default);
            if let Some(ref file) = self.file {
                target.file = Some(file.clone());
            }
            if let Some(ref key) = self.key {
                target.key = Some(key.clone());
            }
        }
        if self.reference_branch.is_some() || self.use_tag {
            let reference = config.reference.get_or_insert_with(ReferenceConfig::default);
            if let Some(ref branch) = self.reference_branch {
                reference.branch = Some(branch.clone());
            }
            if self.use_tag {
                reference.use_tag = Some(true);
            }
        }
        if self.commit {
            config.commit.get_or_insert_with(CommitConfig::default).enabled = Some(true);
        }
        if self.comment {
            config.comment.get_or_insert_with(CommentConfig::default).enabled = Some(true);
        }
    }

    /// Labels and head branch, from flags first and the event payload second.
    fn pull_request(&self) -> anyhow::Result<(Vec<String>, Option<String>)> {
        let event_path = self.event.clone().or_else(|| {
            std::env::var(ENV_EVENT_PATH)
                .ok()
                .filter(|value| !value.is_empty())
                .map(Utf8PathBuf::from)
        });

        let event = match event_path {
            Some(ref path) if self.labels.is_empty() || self.head.is_none() => Some(
                PullRequestEvent::from_path(path)
                    .with_context(|| format!("failed to read pull request event {path}"))?,
            ),
            _ => None,
        };

        let labels = if self.labels.is_empty() {
            event.as_ref().map(PullRequestEvent::label_names).unwrap_or_default()
        } else {
            self.labels.clone()
        };
        let head = self
            .head
            .clone()
            .or_else(|| event.as_ref().map(|e| e.head_ref().to_string()));

        Ok((labels, head))
    }
}

/// Execute the bump command.
#[instrument(name = "cmd_bump", skip_all, fields(json_output))]
pub fn cmd_bump(
    args: BumpArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing bump command");

    let mut config = config.clone();
    args.apply_to(&mut config);
    let (labels, head_ref) = args.pull_request()?;
    debug!(?labels, ?head_ref, "pull request context");

    let identity = Identity {
        name: config.commit.as_ref().and_then(|c| c.username.clone()),
        email: config.commit.as_ref().and_then(|c| c.email.clone()),
    };
    let mut remote = GitRemote::new(cwd).with_identity(identity);

    let plan = match bump::plan_bump(cwd, &config, labels.as_slice(), &remote) {
        Ok(plan) => plan,
        Err(err) => {
            report_label_failure(&err, &config, global_json)?;
            return Err(err).context("bump planning failed");
        }
    };

    let options = BumpOptions {
        dry_run: args.dry_run,
        head_ref,
    };
    let outcome = plan
        .execute(cwd, &options, Some(&mut remote))
        .context("bump failed")?;

    write_step_outputs(&outcome)?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

/// Surface the relabeling hint so a workflow can post it on the pull request.
fn report_label_failure(err: &BumpError, config: &Config, global_json: bool) -> anyhow::Result<()> {
    let Some(body) = err.comment_body().filter(|_| config.comment_enabled()) else {
        return Ok(());
    };
    if global_json {
        let payload = serde_json::json!({ "error": err.to_string(), "comment": body });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{body}");
    }
    Ok(())
}

/// Append `version` and `has_changed` to the file named by `GITHUB_OUTPUT`.
fn write_step_outputs(outcome: &BumpOutcome) -> anyhow::Result<()> {
    let Some(path) = std::env::var(ENV_OUTPUT).ok().filter(|value| !value.is_empty()) else {
        return Ok(());
    };
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open step output file {path}"))?;
    writeln!(file, "version={}", outcome.version)?;
    writeln!(file, "has_changed={}", outcome.has_changed)?;
    if let Some(ref comment) = outcome.comment
        && !comment.contains('\n')
    {
        writeln!(file, "comment={comment}")?;
    } else if outcome.comment.is_some() {
        warn!("multi-line comment not written to step outputs");
    }
    Ok(())
}

fn print_outcome(outcome: &BumpOutcome) {
    if !outcome.has_changed {
        println!(
            "{} {} is already {}",
            "○".yellow(),
            outcome.file.as_str().cyan(),
            outcome.version.green().bold()
        );
        println!("{}", "Version already updated. Skipping.".dimmed());
        return;
    }

    println!(
        "{}: {} → {} ({})",
        "Version".bold(),
        outcome.previous.dimmed(),
        outcome.version.green().bold(),
        outcome.level
    );
    println!("{}: {} [{}]", "File".dimmed(), outcome.file.as_str().cyan(), outcome.key);

    if outcome.dry_run {
        println!();
        println!("{}", "Dry run, no changes made.".yellow());
        return;
    }

    println!("  {} Manifest updated", "✓".green());
    if let Some(ref commit) = outcome.commit {
        println!("  {} Committed {}", "✓".green(), commit.dimmed());
    }
    if let Some(ref comment) = outcome.comment {
        println!();
        println!("{comment}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_fill_missing_sections() {
        let args = BumpArgs {
            file: Some("package.json".into()),
            key: Some("app.version".into()),
            reference_branch: Some("develop".into()),
            use_tag: true,
            commit: true,
            comment: true,
            ..BumpArgs::default()
        };
        let mut config = Config::default();
        args.apply_to(&mut config);

        assert_eq!(config.target_file(), Some(Utf8Path::new("package.json")));
        assert_eq!(config.target_key(), "app.version");
        assert_eq!(config.reference_branch(), "develop");
        assert!(config.use_tag());
        assert!(config.commit_enabled());
        assert!(config.comment_enabled());
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let mut config = Config {
            target: Some(TargetConfig {
                file: Some("pubspec.yaml".into()),
                key: None,
            }),
            ..Config::default()
        };
        BumpArgs::default().apply_to(&mut config);

        assert_eq!(config.target_file(), Some(Utf8Path::new("pubspec.yaml")));
        assert!(!config.commit_enabled());
        assert!(!config.use_tag());
    }

    #[test]
    fn explicit_labels_skip_the_event() {
        let args = BumpArgs {
            labels: vec!["minor".into()],
            head: Some("feature".into()),
            event: Some("/nonexistent/event.json".into()),
            ..BumpArgs::default()
        };
        let (labels, head) = args.pull_request().unwrap();
        assert_eq!(labels, ["minor"]);
        assert_eq!(head.as_deref(), Some("feature"));
    }

    #[test]
    fn event_supplies_labels_and_head() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("event.json")).unwrap();
        std::fs::write(
            &path,
            r#"{ "pull_request": { "number": 7, "labels": [{ "name": "patch" }], "head": { "ref": "fix/typo" } } }"#,
        )
        .unwrap();

        let args = BumpArgs {
            event: Some(path),
            ..BumpArgs::default()
        };
        let (labels, head) = args.pull_request().unwrap();
        assert_eq!(labels, ["patch"]);
        assert_eq!(head.as_deref(), Some("fix/typo"));
    }
}
