//! Logging infrastructure for the HDHomeRun SDK
//!
//! This module provides a centralized logging setup so binaries and tests
//! can pick between quiet operation and verbose diagnostics.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No output
    Silent,
    /// Compact stderr output
    Development,
    /// Verbose diagnostics with source locations
    Debug,
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),
}

/// Initialize logging with the specified mode
///
/// Call this early, before any discovery or polling that might log.
///
/// # Examples
///
/// ```rust,ignore
/// hdhomerun_state::logging::init_logging(LoggingMode::Development)?;
/// ```
///
/// # Environment Variables
///
/// - `HDHOMERUN_LOG_LEVEL`: Override the filter (e.g. `debug`,
///   `hdhomerun_discovery=trace`)
/// - `RUST_LOG`: Used when `HDHOMERUN_LOG_LEVEL` is unset
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .pretty()
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Initialize logging from `HDHOMERUN_LOG_MODE`
///
/// - "silent" -> LoggingMode::Silent
/// - "development" -> LoggingMode::Development
/// - "debug" -> LoggingMode::Debug
///
/// Unset means silent; any other value is an error.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    init_logging(mode_from_env()?)
}

fn mode_from_env() -> Result<LoggingMode, LoggingError> {
    match std::env::var("HDHOMERUN_LOG_MODE") {
        Err(_) => Ok(LoggingMode::Silent),
        Ok(value) => parse_mode(&value)
            .ok_or_else(|| LoggingError::InvalidEnv(format!("HDHOMERUN_LOG_MODE={}", value))),
    }
}

fn parse_mode(value: &str) -> Option<LoggingMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "silent" | "" => Some(LoggingMode::Silent),
        "development" | "dev" => Some(LoggingMode::Development),
        "debug" => Some(LoggingMode::Debug),
        _ => None,
    }
}

/// HDHOMERUN_LOG_LEVEL, then RUST_LOG, then the default level
fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directives = std::env::var("HDHOMERUN_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    EnvFilter::try_new(&directives)
        .map_err(|e| LoggingError::InvalidEnv(format!("{}: {}", directives, e)))
}

/// Check if logging has been initialized
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_mode() {
        assert!(init_logging(LoggingMode::Silent).is_ok());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("development"), Some(LoggingMode::Development));
        assert_eq!(parse_mode("DEBUG"), Some(LoggingMode::Debug));
        assert_eq!(parse_mode("silent"), Some(LoggingMode::Silent));
        assert_eq!(parse_mode("loud"), None);
    }
}
