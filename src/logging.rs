//! Logging setup
//!
//! Transfer threads are named after the transfer they carry
//! (`transfer-0-Hangga->John`), so every layer prints thread names: that is
//! the only way to tell interleaved attempts apart in a deadlocked run.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;
use crate::error::LabError;

/// Map the `rotation` config value onto an appender rotation.
/// Unknown values fall back to a single, never-rotated file.
fn rotation(name: &str) -> Rotation {
    match name {
        "minutely" => Rotation::MINUTELY,
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        _ => Rotation::NEVER,
    }
}

/// Directives used when `RUST_LOG` is unset. The blocking pool behind the
/// serialized executor is chatty at debug level, so tokio stays at warn.
fn default_directives(log_level: &str) -> String {
    format!("{log_level},tokio=warn,runtime=warn")
}

fn file_appender(config: &AppConfig) -> Result<RollingFileAppender, LabError> {
    RollingFileAppender::builder()
        .rotation(rotation(&config.rotation))
        .filename_prefix(&config.log_file)
        .build(&config.log_dir)
        .map_err(|e| LabError::LogInit(e.to_string()))
}

/// Install the global subscriber.
///
/// Text mode writes to both the log file and stdout; JSON mode writes the
/// file only, so `--json` reports on stdout stay machine-readable. Keep the
/// returned guard alive until exit or buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> Result<WorkerGuard, LabError> {
    let (writer, guard) = tracing_appender::non_blocking(file_appender(config)?);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_thread_names(true)
            .with_thread_ids(true)
            .with_writer(writer)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_thread_names(true)
            .with_writer(writer)
            .with_ansi(false);
        let stdout_layer = fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_names(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_names() {
        assert_eq!(rotation("daily"), Rotation::DAILY);
        assert_eq!(rotation("hourly"), Rotation::HOURLY);
        assert_eq!(rotation("minutely"), Rotation::MINUTELY);
        assert_eq!(rotation("weekly"), Rotation::NEVER);
        assert_eq!(rotation(""), Rotation::NEVER);
    }

    #[test]
    fn test_default_directives_quiet_tokio() {
        assert_eq!(default_directives("debug"), "debug,tokio=warn,runtime=warn");
        // Must parse as a filter
        assert!(EnvFilter::try_new(default_directives("info")).is_ok());
    }
}
