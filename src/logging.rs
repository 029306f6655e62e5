//! Logging setup for acton-chain.
//!
//! Log output goes either to stderr or to a daily rolling file in an
//! XDG-compliant location. `RUST_LOG` overrides the configured level.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Standard error, with ANSI colours.
    #[default]
    Stderr,
    /// Daily rolling file under `log_dir`.
    File,
}

/// Logging configuration.
///
/// # Example
///
/// ```rust
/// use acton_chain::logging::{LogLevel, LogTarget, LoggingConfig};
///
/// let config = LoggingConfig::new()
///     .with_target(LogTarget::File)
///     .with_level(LogLevel::Debug);
/// assert_eq!(config.app_name, "acton-chain");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether logging is enabled.
    pub enabled: bool,
    /// Log files are named `{app_name}.log` with daily rotation.
    pub app_name: String,
    /// Custom log directory. If None, uses XDG data dir + "acton/logs".
    pub log_dir: Option<PathBuf>,
    /// Level used when `RUST_LOG` is unset.
    pub level: LogLevel,
    /// Output destination.
    pub target: LogTarget,
}

impl LoggingConfig {
    /// Creates a new LoggingConfig with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a disabled logging configuration.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Sets the application name for log file naming.
    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Sets a custom log directory.
    #[must_use]
    pub fn with_log_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(path.into());
        self
    }

    /// Sets the log level filter.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the output destination.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_name: "acton-chain".to_string(),
            log_dir: None,
            level: LogLevel::default(),
            target: LogTarget::default(),
        }
    }
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level - most verbose.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    Info,
    /// Warn level - default, so chain runs stay quiet on the terminal.
    #[default]
    Warn,
    /// Error level - least verbose.
    Error,
}

impl LogLevel {
    /// Converts to tracing_subscriber LevelFilter.
    #[must_use]
    pub fn to_filter(self) -> tracing_subscriber::filter::LevelFilter {
        match self {
            Self::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
            Self::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            Self::Info => tracing_subscriber::filter::LevelFilter::INFO,
            Self::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            Self::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        }
    }
}

/// Guard that must be held to keep logging active.
///
/// When dropped, flushes pending log lines.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

impl fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingGuard").finish_non_exhaustive()
    }
}

static LOGGING_GUARD: std::sync::OnceLock<LoggingGuard> = std::sync::OnceLock::new();

/// Errors that can occur during logging initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingError {
    /// The specific error that occurred.
    pub kind: LoggingErrorKind,
}

/// Specific logging error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingErrorKind {
    /// Failed to determine XDG data directory.
    NoDataDir,
    /// Failed to create log directory.
    CreateDirFailed {
        /// The path that could not be created.
        path: PathBuf,
        /// The reason for failure.
        reason: String,
    },
    /// Subscriber initialization failed.
    SubscriberInitFailed {
        /// The reason for failure.
        reason: String,
    },
}

impl LoggingError {
    /// Creates a new LoggingError with the given kind.
    #[must_use]
    pub fn new(kind: LoggingErrorKind) -> Self {
        Self { kind }
    }

    /// Creates an error for missing XDG data directory.
    #[must_use]
    pub fn no_data_dir() -> Self {
        Self::new(LoggingErrorKind::NoDataDir)
    }

    /// Creates an error for failed directory creation.
    #[must_use]
    pub fn create_dir_failed(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::new(LoggingErrorKind::CreateDirFailed {
            path,
            reason: reason.into(),
        })
    }

    /// Creates an error for subscriber initialization failure.
    #[must_use]
    pub fn subscriber_init_failed(reason: impl Into<String>) -> Self {
        Self::new(LoggingErrorKind::SubscriberInitFailed {
            reason: reason.into(),
        })
    }

    /// Returns true if this is a missing data directory error.
    #[must_use]
    pub fn is_no_data_dir(&self) -> bool {
        matches!(self.kind, LoggingErrorKind::NoDataDir)
    }
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LoggingErrorKind::NoDataDir => {
                write!(
                    f,
                    "could not determine XDG data directory; \
                     set XDG_DATA_HOME or use a custom log_dir"
                )
            }
            LoggingErrorKind::CreateDirFailed { path, reason } => {
                write!(
                    f,
                    "failed to create log directory '{}': {}; check permissions",
                    path.display(),
                    reason
                )
            }
            LoggingErrorKind::SubscriberInitFailed { reason } => {
                write!(
                    f,
                    "failed to initialize tracing subscriber: {}; \
                     a subscriber may already be set",
                    reason
                )
            }
        }
    }
}

impl std::error::Error for LoggingError {}

/// Returns the log directory for file logging.
///
/// # Errors
///
/// Returns `NoDataDir` when no custom directory is set and the XDG data
/// directory cannot be determined.
pub fn log_dir(config: &LoggingConfig) -> Result<PathBuf, LoggingError> {
    if let Some(ref custom_dir) = config.log_dir {
        return Ok(custom_dir.clone());
    }

    dirs::data_local_dir()
        .map(|dir| dir.join("acton").join("logs"))
        .ok_or_else(LoggingError::no_data_dir)
}

/// Installs the global tracing subscriber.
///
/// Returns `Ok(None)` when logging is disabled. The returned guard must be
/// held for log lines to be flushed.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<LoggingGuard>, LoggingError> {
    if !config.enabled {
        return Ok(None);
    }

    let (writer, guard) = match config.target {
        LogTarget::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogTarget::File => {
            let dir = log_dir(config)?;
            std::fs::create_dir_all(&dir)
                .map_err(|e| LoggingError::create_dir_failed(dir.clone(), e.to_string()))?;
            let appender =
                tracing_appender::rolling::daily(&dir, format!("{}.log", config.app_name));
            tracing_appender::non_blocking(appender)
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(config.level.to_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(config.target == LogTarget::Stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| LoggingError::subscriber_init_failed(e.to_string()))?;

    Ok(Some(LoggingGuard { _guard: guard }))
}

/// Installs the subscriber once and keeps its guard for the process lifetime.
///
/// Returns `Ok(false)` if logging is disabled or was already initialised.
///
/// # Errors
///
/// See [`init_logging`].
pub fn init_and_store_logging(config: &LoggingConfig) -> Result<bool, LoggingError> {
    if LOGGING_GUARD.get().is_some() {
        return Ok(false);
    }

    match init_logging(config)? {
        Some(guard) => {
            // A concurrent initialiser may have won; its guard is kept.
            let _ = LOGGING_GUARD.set(guard);
            Ok(true)
        }
        None => Ok(false),
    }
}
