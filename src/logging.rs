//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays reserved for reports. `RUST_LOG`, when
//! set, overrides the level chosen on the command line.

use std::io;

use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Minimum level logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Debug and above.
    Debug,
    /// Info and above.
    Info,
    /// Warnings and errors.
    #[default]
    Warn,
    /// Errors only.
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

fn filter(level: LogLevel) -> Result<EnvFilter, String> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("scaffold={}", level.directive())))
        .map_err(|e| format!("Failed to create log filter: {e}"))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already
/// installed.
pub fn init_logging(level: LogLevel, format: LogFormat) -> Result<(), String> {
    let registry = tracing_subscriber::registry().with(filter(level)?);
    let installed = match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(io::stderr).with_target(true))
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr).with_current_span(true))
            .try_init(),
    };
    installed.map_err(|e| format!("Failed to initialise logging: {e}"))?;
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), ?format, "logging initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_onto_tracing() {
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
        assert_eq!(Level::from(LogLevel::default()), Level::WARN);
    }

    #[test]
    fn every_level_builds_a_filter() {
        for level in [LogLevel::Trace, LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error] {
            assert!(filter(level).is_ok(), "{}", level.directive());
        }
    }
}
