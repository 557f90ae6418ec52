//! File logging.
//!
//! The front end owns stdout, so log lines go to `logs/` next to the
//! executable, one file per run. `RUST_LOG` selects the level (default
//! `info`), e.g. `RUST_LOG=rusty_edit::assist=debug`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_PREFIX: &str = "rusty-edit";

/// Directory log files are written to.
pub fn log_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("logs")))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// `rusty-edit.2025-01-31-09-15-00.log`
pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("{LOG_PREFIX}.{}.log", now.format("%Y-%m-%d-%H-%M-%S"))
}

/// Install the global subscriber writing into [`log_dir`].
///
/// Problems are reported on stderr and leave logging disabled; they are never
/// fatal. Keep the returned guard alive until exit so buffered lines are
/// flushed.
pub fn init_logging() -> Option<WorkerGuard> {
    let dir = log_dir();
    match init_logging_in(&dir) {
        Ok((guard, path)) => {
            tracing::info!("Logging initialized - writing to {}", path.display());
            Some(guard)
        }
        Err(e) => {
            eprintln!("Warning: logging disabled: {e:#}");
            None
        }
    }
}

fn init_logging_in(dir: &Path) -> anyhow::Result<(WorkerGuard, PathBuf)> {
    use anyhow::Context as _;

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let path = dir.join(log_file_name(Local::now()));
    let file = fs::File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(file);
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .context("A global subscriber is already installed")?;

    Ok((guard, path))
}
