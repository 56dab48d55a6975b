//! # Logging Utilities
//!
//! Logging infrastructure for Cinder using `tracing`.
//!
//! Console output always goes to **stderr**, so commands that print results
//! on stdout (like `cinder inspect`) stay pipe-friendly. A log file can be
//! added next to the console output.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cinder_utils::init_logging;
//!
//! // Reads RUST_LOG, CINDER_LOG_FORMAT and CINDER_LOG_FILE
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```
//!
//! Keep the returned [`LoggingGuard`] alive for the life of the program: it
//! flushes the background file writer when dropped.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=cinder_core=trace`)
//! - `CINDER_LOG_FORMAT`: Set output format (`json` or `pretty`, default: `pretty`)
//! - `CINDER_LOG_FILE`: Optional path to a log file (console output continues)

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "CINDER_LOG_FORMAT";

/// Environment variable naming an additional log file
pub const LOG_FILE_ENV: &str = "CINDER_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    #[default]
    Pretty,
    /// JSON format, one object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(format!("{s}. Use 'pretty' or 'json'"))),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(format!(
                "{s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            ))),
        }
    }
}

/// Logging setup before it is installed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig
{
    /// Explicit level; overrides `RUST_LOG` when set
    pub level: Option<LogLevel>,
    /// Output format for console and file
    pub format: LogFormat,
    /// Optional log file, written in addition to the console
    pub file: Option<PathBuf>,
}

impl LoggingConfig
{
    /// Read the format and file from the process environment
    pub fn from_env() -> Self
    {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the format and file through `lookup`
    ///
    /// An unrecognized format falls back to pretty output.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self
    {
        Self {
            level: None,
            format: lookup(LOG_FORMAT_ENV)
                .and_then(|s| LogFormat::from_str(&s).ok())
                .unwrap_or_default(),
            file: lookup(LOG_FILE_ENV).filter(|s| !s.is_empty()).map(PathBuf::from),
        }
    }

    /// Set an explicit level
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self
    {
        self.level = Some(level);
        self
    }

    /// Add a log file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.file = Some(path.into());
        self
    }

    /// Install the global subscriber
    ///
    /// ## Errors
    ///
    /// Returns an error if a global subscriber is already installed or the
    /// log file's directory cannot be created.
    pub fn init(self) -> Result<LoggingGuard, LoggingError>
    {
        let level = self.level.map(Level::from);
        let mut layers: Vec<BoxedLayer> = vec![layer(self.format, io::stderr, io::stderr().is_terminal(), level)];

        let mut file_guard = None;
        if let Some(path) = &self.file {
            let (writer, guard) = file_writer(path)?;
            layers.push(layer(self.format, writer, false, level));
            file_guard = Some(guard);
        }

        Registry::default()
            .with(layers)
            .try_init()
            .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;

        Ok(LoggingGuard { _file: file_guard })
    }
}

/// Keeps the background log file writer alive; flushes it on drop
#[derive(Debug)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment
///
/// Reads configuration from environment variables:
/// - `RUST_LOG`: Log level filter (e.g., `debug`, `cinder_core=trace`)
/// - `CINDER_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
/// - `CINDER_LOG_FILE`: Optional path to log file
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    LoggingConfig::from_env().init()
}

/// Initialize logging with explicit level and format
///
/// `CINDER_LOG_FILE` is still honored.
///
/// ## Example
///
/// ```rust,no_run
/// use cinder_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    LoggingConfig {
        format,
        ..LoggingConfig::from_env()
    }
    .with_level(level)
    .init()
}

/// Filter from the explicit level, else `RUST_LOG`, else INFO
fn build_filter(explicit_level: Option<Level>) -> EnvFilter
{
    match explicit_level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
    }
}

fn layer<W>(format: LogFormat, writer: W, ansi: bool, level: Option<Level>) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = build_filter(level);
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(ansi)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_writer(path: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), LoggingError>
{
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidFile(path.display().to_string()))?;

    std::fs::create_dir_all(&directory)?;
    let appender = tracing_appender::rolling::never(directory, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Log file path has no file name
    #[error("Invalid log file path: {0}")]
    InvalidFile(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("dev").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("PROD").unwrap(), LogFormat::Json);
        assert!(matches!(LogFormat::from_str("xml"), Err(LoggingError::InvalidFormat(_))));
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(matches!(LogLevel::from_str("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_log_level_to_tracing_level()
    {
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }

    #[test]
    fn test_config_from_lookup()
    {
        let config = LoggingConfig::from_lookup(|key| match key {
            LOG_FORMAT_ENV => Some("json".to_string()),
            LOG_FILE_ENV => Some("/var/log/cinder.log".to_string()),
            _ => None,
        });
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/var/log/cinder.log")));
        assert_eq!(config.level, None);
    }

    #[test]
    fn test_config_defaults_when_unset_or_invalid()
    {
        let config = LoggingConfig::from_lookup(|key| (key == LOG_FORMAT_ENV).then(|| "xml".to_string()));
        assert_eq!(config, LoggingConfig::default());

        let config = LoggingConfig::from_lookup(|key| (key == LOG_FILE_ENV).then(String::new));
        assert_eq!(config.file, None);
    }

    #[test]
    fn test_file_writer_creates_directory()
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("cinder.log");
        let (_writer, _guard) = file_writer(&path).unwrap();
        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn test_file_writer_rejects_path_without_name()
    {
        assert!(matches!(file_writer(Path::new("/")), Err(LoggingError::InvalidFile(_))));
    }
}
