//! Tracing setup for Peerwatch
//!
//! Console logs at a user-controlled level plus a full trace log on disk, so a
//! stalled fetch or a playback that never started can be diagnosed after the
//! run has ended.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Name of the per-run trace log inside the logs directory.
pub const LAST_RUN_LOG: &str = "peerwatch-last-run.log";

/// Errors raised while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TracingSetupError {
    #[error("Cannot prepare log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("A global tracing subscriber is already installed: {reason}")]
    AlreadyInstalled { reason: String },
}

/// Initialize tracing with dual output: console (user level) + file (trace).
///
/// `RUST_LOG` takes precedence over `console_level` for the console layer.
/// The file layer always records everything and is truncated on each run.
///
/// Returns the path of the trace log.
///
/// # Errors
///
/// - `TracingSetupError::LogFile` - Logs directory or file cannot be created
/// - `TracingSetupError::AlreadyInstalled` - Called twice in one process
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<PathBuf, TracingSetupError> {
    let logs_path = logs_dir.unwrap_or_else(|| Path::new("logs"));
    let log_file_path = logs_path.join(LAST_RUN_LOG);

    let log_file = create_dir_all(logs_path)
        .and_then(|()| File::create(&log_file_path))
        .map_err(|source| TracingSetupError::LogFile {
            path: log_file_path.clone(),
            source,
        })?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level.to_string()));

    let console_layer = fmt::layer()
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new("trace"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| TracingSetupError::AlreadyInstalled {
            reason: e.to_string(),
        })?;

    tracing::debug!(
        "Tracing initialized: console={}, trace_file={}",
        console_level,
        log_file_path.display()
    );

    Ok(log_file_path)
}

/// CLI log levels for user control
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Only error messages
    Error,
    /// Warning and error messages
    #[default]
    Warn,
    /// Informational, warning, and error messages
    Info,
    /// Debug, informational, warning, and error messages
    Debug,
    /// All messages including detailed tracing
    Trace,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_levels_map_to_tracing_levels() {
        assert_eq!(Level::from(CliLogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(CliLogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(CliLogLevel::Trace), Level::TRACE);
    }

    #[test]
    fn test_default_level_is_warn() {
        assert_eq!(CliLogLevel::default(), CliLogLevel::Warn);
    }
}
