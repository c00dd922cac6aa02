//! Logging through `tracing`.
//!
//! The library only emits events. The binary installs the subscriber once
//! with [`init_logging`]:
//!
//! - `warn`: skipped rows, cancellation
//! - `info`: pipeline progress and summary counts
//! - `debug`: per-group decisions, collaborator call sizes
//! - `trace`: full instructions and replies

use std::io;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, with colors.
    #[default]
    Pretty,
    /// Single-line.
    Compact,
    /// One JSON object per event.
    Json,
}

/// Configuration for the global subscriber.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    /// Let `RUST_LOG` override `level`.
    pub use_env_filter: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            with_ansi: true,
            with_target: false,
            use_env_filter: true,
        }
    }
}

impl LogConfig {
    /// `-q` (negative) warn, none info, `-v` debug, `-vv` trace.
    pub fn from_verbosity(verbosity: i8) -> Self {
        let level = match verbosity {
            i8::MIN..=-1 => Level::WARN,
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            use_env_filter: verbosity == 0,
            ..Default::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(format!("sqlforge={}", self.level.as_str().to_lowercase()));
        if self.use_env_filter {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback())
        } else {
            fallback()
        }
    }
}

/// Install the global subscriber; events go to stderr.
///
/// # Panics
///
/// Panics if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) {
    let filter = config.filter();
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr).with_target(config.with_target))
            .init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .without_time()
                    .with_writer(io::stderr)
                    .with_ansi(config.with_ansi)
                    .with_target(config.with_target),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .without_time()
                    .with_writer(io::stderr)
                    .with_ansi(config.with_ansi)
                    .with_target(config.with_target),
            )
            .init(),
    }
}

/// Convenient progress logging functions
pub fn log_info(msg: impl AsRef<str>) {
    tracing::info!("{}", msg.as_ref());
}

pub fn log_success(msg: impl AsRef<str>) {
    tracing::info!(outcome = "ok", "{}", msg.as_ref());
}

pub fn log_warning(msg: impl AsRef<str>) {
    tracing::warn!("{}", msg.as_ref());
}

pub fn log_error(msg: impl AsRef<str>) {
    tracing::error!("{}", msg.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_verbosity() {
        assert_eq!(LogConfig::from_verbosity(-1).level, Level::WARN);
        assert_eq!(LogConfig::from_verbosity(0).level, Level::INFO);
        assert_eq!(LogConfig::from_verbosity(1).level, Level::DEBUG);
        assert_eq!(LogConfig::from_verbosity(3).level, Level::TRACE);
    }

    #[test]
    fn test_explicit_verbosity_ignores_env() {
        assert!(LogConfig::from_verbosity(0).use_env_filter);
        assert!(!LogConfig::from_verbosity(1).use_env_filter);
    }
}
