//! File logging setup.
//!
//! Stdout belongs to the chat, so logs go to a daily file under
//! `$CLOUDENG_HOME/logs`. The filter comes from `CLOUDENG_LOG` (default
//! `info`).

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV_VAR: &str = "CLOUDENG_LOG";

const LOG_FILE_PREFIX: &str = "cloudeng.log";

/// Builds the filter from `CLOUDENG_LOG`, falling back to `info`.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber writing to `logs_dir`.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes pending lines.
///
/// # Errors
/// Returns an error if the directory cannot be created or a global
/// subscriber is already installed.
pub fn init(logs_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;

    tracing::debug!(dir = %logs_dir.display(), "logging initialized");
    Ok(guard)
}
