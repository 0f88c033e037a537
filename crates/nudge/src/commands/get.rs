//! Get command: print one value.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use serde::Serialize;
use tracing::{debug, instrument};

use nudge_core::{FileFormat, handler};

/// Arguments for the `get` subcommand.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Manifest to read (.json, .yaml, .yml or .podspec)
    pub file: Utf8PathBuf,

    /// Dotted key path, e.g. `version` or `package.version`
    pub key: String,
}

#[derive(Serialize)]
struct GetOutput<'a> {
    file: &'a Utf8Path,
    format: FileFormat,
    key: &'a str,
    value: String,
}

/// Print the value at `key`. Plain output is the bare value, so it can be
/// captured by shell substitution.
#[instrument(name = "cmd_get", skip_all, fields(file = %args.file, key = %args.key))]
pub fn cmd_get(args: GetArgs, global_json: bool, cwd: &Utf8Path) -> anyhow::Result<()> {
    let path = super::resolve_path(cwd, &args.file);
    let file = handler::from_path(&path).with_context(|| format!("failed to open {path}"))?;
    let value = file
        .get(&args.key)
        .with_context(|| format!("failed to read `{}` from {}", args.key, args.file))?;
    debug!(%value, "value read");

    if global_json {
        let output = GetOutput {
            file: &args.file,
            format: file.format(),
            key: &args.key,
            value,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{value}");
    }
    Ok(())
}
