//! Info command: show package, config, and target file information.

use camino::Utf8Path;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use nudge_core::config::{self, Config};
use nudge_core::{git, handler};
use nudge_core::labels::LabelSet;

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    key: String,
    reference: String,
    labels: [String; 3],
    commit: bool,
    comment: bool,
}

impl ConfigInfo {
    fn from_config(config: &Config, cwd: &Utf8Path) -> Self {
        let labels = LabelSet::from_config(config);
        let reference = if config.use_tag() {
            "latest tag".to_string()
        } else {
            format!("branch {}", config.reference_branch())
        };
        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            key: config.target_key().to_string(),
            reference,
            labels: [labels.patch, labels.minor, labels.major],
            commit: config.commit_enabled(),
            comment: config.comment_enabled(),
        }
    }
}

/// What the configured target file currently holds.
#[derive(Serialize)]
struct TargetInfo {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl TargetInfo {
    fn inspect(config: &Config, cwd: &Utf8Path) -> Option<Self> {
        let file = config.target_file()?;
        let path = super::resolve_path(cwd, file);
        let mut info = Self {
            file: file.to_string(),
            format: None,
            version: None,
            error: None,
        };

        match handler::from_path(&path) {
            Ok(handler) => {
                info.format = Some(handler.format().to_string());
                match handler.get(config.target_key()) {
                    Ok(version) => info.version = Some(version),
                    Err(e) => info.error = Some(e.to_string()),
                }
            }
            Err(e) => info.error = Some(e.to_string()),
        }
        debug!(file = %info.file, version = ?info.version, "inspected target file");
        Some(info)
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
    git_repository: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<TargetInfo>,
}

/// Print package information.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory for config discovery and the target file
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let full_info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, cwd),
        git_repository: git::is_inside_repo(cwd).unwrap_or(false),
        target: TargetInfo::inspect(config, cwd),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&full_info)?);
        return Ok(());
    }

    let package = &full_info.package;
    println!("{} {}", package.name.bold(), package.version.green());
    if !package.description.is_empty() {
        println!("{}", package.description);
    }
    if !package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), package.license);
    }
    if !package.repository.is_empty() {
        println!("{}: {}", "Repository".dimmed(), package.repository.cyan());
    }

    let cfg = &full_info.config;
    println!();
    println!("{}", "Configuration".bold().underline());
    if let Some(ref path) = cfg.config_file {
        println!("{}: {}", "Config file".dimmed(), path.cyan());
    } else {
        println!("{}: {}", "Config file".dimmed(), "none loaded".yellow());
    }
    println!("{}: {}", "Log level".dimmed(), cfg.log_level);
    if let Some(ref dir) = cfg.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    println!("{}: {}", "Version key".dimmed(), cfg.key);
    println!("{}: {}", "Reference".dimmed(), cfg.reference);
    println!("{}: {}", "Labels".dimmed(), cfg.labels.join(", "));
    println!(
        "{}: commit {}, comment {}",
        "Outputs".dimmed(),
        on_off(cfg.commit),
        on_off(cfg.comment)
    );

    println!();
    println!("{}", "Target".bold().underline());
    if !full_info.git_repository {
        println!(
            "  {} {}",
            "○".yellow(),
            "Not a git repository; bumps use the local version as reference".yellow()
        );
    }
    match full_info.target {
        Some(TargetInfo {
            ref file,
            version: Some(ref version),
            ref format,
            ..
        }) => {
            println!("{}: {}", "File".dimmed(), file.cyan());
            if let Some(format) = format {
                println!("{}: {}", "Format".dimmed(), format);
            }
            println!("{}: {}", "Version".dimmed(), version.green().bold());
        }
        Some(TargetInfo {
            ref file,
            ref error,
            ..
        }) => {
            println!("{}: {}", "File".dimmed(), file.cyan());
            println!(
                "  {} {}",
                "✗".red(),
                error.as_deref().unwrap_or("unreadable").red()
            );
        }
        None => {
            println!(
                "  {} {}",
                "○".yellow(),
                "No target file configured".yellow()
            );
        }
    }

    Ok(())
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
