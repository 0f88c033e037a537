//! Observability setup: structured logging.
//!
//! Logs are JSON lines written to a daily-rolling file. This module never
//! writes to stdout, which carries command output (values, JSON results).
//! When no log file can be opened, logs go to stderr instead.

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::OpenOptions;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "NUDGE_LOG_PATH";
const ENV_LOG_DIR: &str = "NUDGE_LOG_DIR";
const LOG_FILE_SUFFIX: &str = ".jsonl";

/// Where logs should go, before environment overrides.
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// Base name of the log file.
    pub service: String,
    /// Directory from the `log_dir` config setting.
    pub log_dir: Option<Utf8PathBuf>,
}

impl ObservabilityConfig {
    /// Config for this binary, with the configured log directory.
    pub fn new(log_dir: Option<Utf8PathBuf>) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            log_dir,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LogTarget {
    dir: Utf8PathBuf,
    file_name: String,
}

/// Keeps the background log writer alive; drop it last.
pub struct ObservabilityGuard {
    _log_guard: WorkerGuard,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_observability(
    cfg: &ObservabilityConfig,
    env_filter: EnvFilter,
) -> Result<ObservabilityGuard> {
    let (writer, guard) = match build_log_writer(&cfg.service, cfg.log_dir.as_deref()) {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("Warning: {err}. Falling back to stderr logging.");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    let log_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_ansi(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .try_init()?;

    tracing::debug!("observability initialized");

    Ok(ObservabilityGuard { _log_guard: guard })
}

/// Build an `EnvFilter` based on CLI flags and environment.
///
/// Priority: quiet flag > verbose flag > RUST_LOG env > default_level
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }

    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

// ──────────────────────────────────────────────
// Log target resolution
// ──────────────────────────────────────────────

fn build_log_writer(service: &str, config_dir: Option<&Utf8Path>) -> Result<(NonBlocking, WorkerGuard)> {
    let target = resolve_log_target(
        service,
        env_path(ENV_LOG_PATH),
        env_path(ENV_LOG_DIR),
        config_dir.map(Utf8Path::to_path_buf),
    )
    .map_err(|e| anyhow::anyhow!(e))?;

    let appender = tracing_appender::rolling::daily(&target.dir, &target.file_name);
    Ok(tracing_appender::non_blocking(appender))
}

fn env_path(name: &str) -> Option<Utf8PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .map(Utf8PathBuf::from)
}

/// Pick the log file: explicit path, then directory overrides, then the
/// first writable platform candidate.
fn resolve_log_target(
    service: &str,
    path_override: Option<Utf8PathBuf>,
    dir_override: Option<Utf8PathBuf>,
    config_dir: Option<Utf8PathBuf>,
) -> Result<LogTarget, String> {
    if let Some(path) = path_override {
        return target_from_path(&path);
    }

    let file_name = format!("{service}{LOG_FILE_SUFFIX}");
    if let Some(dir) = dir_override.or(config_dir) {
        ensure_writable(&dir, &file_name)?;
        return Ok(LogTarget { dir, file_name });
    }

    let mut candidates = Vec::new();
    if let Some(dirs) = directories::ProjectDirs::from("", "", service)
        && let Ok(dir) = Utf8PathBuf::try_from(dirs.data_local_dir().to_path_buf())
    {
        candidates.push(dir.join("logs"));
    }
    if let Ok(dir) = Utf8PathBuf::try_from(std::env::temp_dir()) {
        candidates.push(dir.join(service));
    }

    candidates
        .into_iter()
        .find(|dir| ensure_writable(dir, &file_name).is_ok())
        .map(|dir| LogTarget { dir, file_name })
        .ok_or_else(|| "no writable log directory found".to_string())
}

fn target_from_path(path: &Utf8Path) -> Result<LogTarget, String> {
    let file_name = path
        .file_name()
        .ok_or_else(|| format!("{ENV_LOG_PATH} must include a file name"))?
        .to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    ensure_writable(&dir, &file_name)?;
    Ok(LogTarget { dir, file_name })
}

fn ensure_writable(dir: &Utf8Path, file_name: &str) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("failed to create log directory {dir}: {e}"))?;

    let path = dir.join(file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("failed to open log file {path}: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_dir() -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, path)
    }

    #[test]
    fn env_filter_quiet_overrides() {
        assert_eq!(env_filter(true, 2, "info").to_string(), "error");
    }

    #[test]
    fn env_filter_verbose_maps_to_debug_and_trace() {
        assert_eq!(env_filter(false, 1, "info").to_string(), "debug");
        assert_eq!(env_filter(false, 3, "info").to_string(), "trace");
    }

    #[test]
    fn path_override_wins() {
        let (_tmp, dir) = temp_dir();
        let file = dir.join("custom.jsonl");
        let target =
            resolve_log_target("demo", Some(file.clone()), Some(dir.join("other")), None).unwrap();
        assert_eq!(target.dir, dir);
        assert_eq!(target.file_name, "custom.jsonl");
        assert!(file.exists());
    }

    #[test]
    fn dir_override_beats_config_dir() {
        let (_tmp, dir) = temp_dir();
        let target = resolve_log_target(
            "demo",
            None,
            Some(dir.join("env")),
            Some(dir.join("config")),
        )
        .unwrap();
        assert_eq!(target.dir, dir.join("env"));
        assert_eq!(target.file_name, "demo.jsonl");
    }

    #[test]
    fn config_dir_is_created() {
        let (_tmp, dir) = temp_dir();
        let nested = dir.join("a").join("b");
        let target = resolve_log_target("demo", None, None, Some(nested.clone())).unwrap();
        assert_eq!(target.dir, nested);
        assert!(nested.join("demo.jsonl").exists());
    }

    #[test]
    fn platform_candidates_resolve_somewhere() {
        let target = resolve_log_target("nudge-test", None, None, None).unwrap();
        assert_eq!(target.file_name, "nudge-test.jsonl");
    }
}
