//! Logging initialization for the CLI
//!
//! Logs go to stderr so stdout only ever carries the JSON result. Supports
//! JSON or human-readable output, an optional rolling log file and `RUST_LOG`
//! overrides.

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogRotation, LoggingConfig};

/// Keeps the file writer flushing; hold it until the program exits.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let (file_writer, file_guard) = match &config.file_directory {
        Some(dir) => {
            let (writer, guard) = create_file_appender(config, dir)?;
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(build_env_filter(config));

    if config.json {
        let console_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr);
        let file_layer = file_writer.map(|writer| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(writer)
        });
        registry.with(console_layer).with(file_layer).try_init()?;
    } else {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(std::io::stderr);
        let file_layer = file_writer.map(|writer| {
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer)
        });
        registry.with(console_layer).with(file_layer).try_init()?;
    }

    tracing::debug!(
        level = %config.level,
        json = config.json,
        file = config.file_directory.is_some(),
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

fn create_file_appender(
    config: &LoggingConfig,
    dir: &Path,
) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(dir)?;

    let prefix = config.file_prefix.as_str();
    let file_appender = match config.file_rotation {
        LogRotation::Daily => tracing_appender::rolling::daily(dir, prefix),
        LogRotation::Hourly => tracing_appender::rolling::hourly(dir, prefix),
        LogRotation::Minutely => tracing_appender::rolling::minutely(dir, prefix),
        LogRotation::Never => tracing_appender::rolling::never(dir, prefix),
    };

    Ok(tracing_appender::non_blocking(file_appender))
}
