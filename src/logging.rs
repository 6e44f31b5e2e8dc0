//! Log destination selection for the stage trace lines.
//!
//! Stages log through `tracing`; this module decides where those events go:
//! - `none`: no subscriber is installed and events are discarded
//! - `console`: formatted to stdout
//! - `file`: formatted to `pipeline.log`, truncated at startup
//!
//! `RUST_LOG` overrides the default `debug` filter.

use crate::error::{PipelineError, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Where stage trace lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogTarget {
    #[default]
    None,
    Console,
    File,
}

impl LogTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTarget::None => "none",
            LogTarget::Console => "console",
            LogTarget::File => "file",
        }
    }
}

impl FromStr for LogTarget {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(LogTarget::None),
            "console" => Ok(LogTarget::Console),
            "file" => Ok(LogTarget::File),
            other => Err(PipelineError::UnsupportedLogDestination(other.to_string())),
        }
    }
}

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping it flushes and closes the log file writer.
#[derive(Debug, Default)]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Get default log file name
pub fn default_log_file() -> &'static str {
    "pipeline.log"
}

/// Install the global subscriber for `target`, writing file output to
/// [`default_log_file`] in the working directory.
pub fn init_logging(target: LogTarget) -> Result<LoggingGuard> {
    init_logging_at(target, Path::new(default_log_file()))
}

/// Like [`init_logging`], with an explicit log file path
pub fn init_logging_at(target: LogTarget, log_path: &Path) -> Result<LoggingGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    match target {
        LogTarget::None => Ok(LoggingGuard::default()),
        LogTarget::Console => {
            let stdout_layer = tracing_subscriber::fmt::layer()
                .with_writer(io::stdout)
                .with_target(false);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .try_init()
                .map_err(|e| PipelineError::ConfigError(e.to_string()))?;

            Ok(LoggingGuard::default())
        }
        LogTarget::File => {
            let (dir, file) = prepare_log_file(log_path)?;
            let file_appender = tracing_appender::rolling::never(dir, file);
            let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(false);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .try_init()
                .map_err(|e| PipelineError::ConfigError(e.to_string()))?;

            Ok(LoggingGuard {
                _file_guard: Some(file_guard),
            })
        }
    }
}

/// Create or truncate the log file and split its path for the appender
fn prepare_log_file(log_path: &Path) -> Result<(PathBuf, PathBuf)> {
    File::create(log_path)?;

    let dir = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file = log_path.file_name().map(PathBuf::from).ok_or_else(|| {
        PipelineError::ConfigError(format!("invalid log file path: {}", log_path.display()))
    })?;

    Ok((dir, file))
}
