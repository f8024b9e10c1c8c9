// src/logging.rs
//
// Log initialization. Nothing here is ambient: the embedding application
// calls init() once and holds the returned guard for the process lifetime.

use crate::error::{ConvertError, Result};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name of the plain-text application log.
pub const DEFAULT_LOG_FILE: &str = "pixport.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory the log file is written into (created if missing).
    pub log_dir: PathBuf,
    /// Log file name.
    pub file_name: String,
    /// Default level when RUST_LOG is not set.
    pub level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("."),
            file_name: DEFAULT_LOG_FILE.to_string(),
            level: Level::INFO,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.log_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

/// Install the global subscriber: env-filtered, writing both to stderr and
/// to a non-blocking file appender. The returned guard must be kept alive
/// until shutdown or buffered log lines are lost.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir)
        .map_err(|e| ConvertError::create_dir(config.log_dir.display().to_string(), e))?;

    let appender = tracing_appender::rolling::never(&config.log_dir, &config.file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| ConvertError::internal("logging", e.to_string()))?;

    Ok(guard)
}
