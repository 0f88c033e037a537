//! Set command: splice one value and save.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{info, instrument};

use nudge_core::handler;

/// Arguments for the `set` subcommand.
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Manifest to edit (.json, .yaml, .yml or .podspec)
    pub file: Utf8PathBuf,

    /// Dotted key path, e.g. `version` or `package.version`
    pub key: String,

    /// Replacement value (no quotes or line breaks)
    pub value: String,

    /// Print the edited content instead of saving it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
struct SetOutput<'a> {
    file: &'a Utf8Path,
    key: &'a str,
    previous: String,
    value: &'a str,
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
}

/// Replace the value at `key`, leaving the rest of the file byte-for-byte.
#[instrument(name = "cmd_set", skip_all, fields(file = %args.file, key = %args.key))]
pub fn cmd_set(args: SetArgs, global_json: bool, cwd: &Utf8Path) -> anyhow::Result<()> {
    let path = super::resolve_path(cwd, &args.file);
    let mut file = handler::from_path(&path).with_context(|| format!("failed to open {path}"))?;

    let previous = file
        .get(&args.key)
        .with_context(|| format!("failed to read `{}` from {}", args.key, args.file))?;
    file.set(&args.key, &args.value)
        .with_context(|| format!("failed to set `{}` in {}", args.key, args.file))?;

    if !args.dry_run {
        file.save(&path)
            .with_context(|| format!("failed to save {path}"))?;
        info!(%previous, value = %args.value, "value saved");
    }

    if global_json {
        let output = SetOutput {
            file: &args.file,
            key: &args.key,
            previous,
            value: &args.value,
            dry_run: args.dry_run,
            content: args.dry_run.then(|| file.content()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if args.dry_run {
        print!("{}", file.content());
    } else {
        println!(
            "{} {}: {} → {}",
            "✓".green(),
            args.key.bold(),
            previous.dimmed(),
            args.value.green().bold()
        );
    }
    Ok(())
}
