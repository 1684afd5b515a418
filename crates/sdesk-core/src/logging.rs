//! Tracing subscriber setup.
//!
//! `SDESK_LOG` takes precedence over the configured level. The CLI logs to
//! stderr; the TUI owns the terminal, so it logs to a daily file instead.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogConfig;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "SDESK_LOG";

const LOG_FILE_PREFIX: &str = "sdesk.log";

fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a stderr subscriber.
///
/// Does nothing if a global subscriber is already set.
pub fn init_stderr(config: &LogConfig) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Installs a non-blocking subscriber writing to `<dir>/sdesk.log.<date>`.
///
/// Returns `None` when file logging is disabled. The returned guard must be
/// held until shutdown so buffered lines are flushed.
pub fn init_file(config: &LogConfig, dir: &Path) -> Result<Option<WorkerGuard>> {
    if !config.file {
        return Ok(None);
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(Some(guard))
}
