//! Logging for pulsecheck runs
//!
//! A run appends to a daily file under the XDG state directory,
//! `~/.local/state/pulsecheck/pulsecheck.log.YYYY-MM-DD`. Only pulsecheck's
//! own crates log at the configured level; dependencies are held at `warn`.
//! `RUST_LOG` replaces the whole filter when set.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use chrono::Utc;
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prefix of the rolling log files; the appender adds a `.YYYY-MM-DD` suffix.
pub const LOG_FILE_NAME: &str = "pulsecheck.log";

const FALLBACK_LEVEL: &str = "info";

/// Filter directives for a configured level, e.g. `debug` gives
/// `warn,pulsecheck_core=debug,pulsecheck=debug`.
pub fn default_directives(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    format!("warn,pulsecheck_core={level},pulsecheck={level}")
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(level)))
        .unwrap_or_else(|_| EnvFilter::new(default_directives(FALLBACK_LEVEL)))
}

/// Install the file logger for a CLI run.
///
/// Keep the returned guard alive for the whole run; dropping it flushes the
/// background writer. Fails if the state directory cannot be created or a
/// global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_NAME)
        .max_log_files(config.max_files.max(1))
        .build(&log_dir)
        .map_err(|e| Error::Config(format!("failed to create log file: {}", e)))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(build_filter(&config.level))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {}", e)))?;

    tracing::info!(
        log_file = %log_file_path().display(),
        level = %config.level,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Route logs to the test harness at debug level (or `RUST_LOG`).
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter("debug"))
        .with_test_writer()
        .try_init();
}

/// Keeps the background log writer alive.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Today's log file, as named by the daily rotation.
pub fn log_file_path() -> PathBuf {
    Config::state_dir().join(format!(
        "{}.{}",
        LOG_FILE_NAME,
        Utc::now().format("%Y-%m-%d")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path_is_dated() {
        let path = log_file_path();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("pulsecheck.log."));
        assert_eq!(name.len(), "pulsecheck.log.".len() + "YYYY-MM-DD".len());
        assert_eq!(path.parent().unwrap(), Config::state_dir());
    }

    #[test]
    fn test_default_directives_scope_our_crates() {
        assert_eq!(
            default_directives(" DEBUG "),
            "warn,pulsecheck_core=debug,pulsecheck=debug"
        );
        assert!(EnvFilter::try_new(default_directives("info")).is_ok());
    }
}
