use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set. With a file path the
/// output goes through a non-blocking writer; keep the returned guard alive
/// until exit so buffered lines are flushed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = build_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let Some(file_path) = &config.file_path else {
        match config.format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_target(true).with_line_number(true))
                .try_init()?,
            LogFormat::Pretty => registry
                .with(fmt::layer().pretty().with_target(true).with_file(false))
                .try_init()?,
        }
        return Ok(None);
    };

    let path = Path::new(file_path);
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Log file path has no file name: {file_path}"))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));

    match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(writer),
            )
            .try_init()?,
        LogFormat::Pretty => registry
            .with(fmt::layer().with_ansi(false).with_target(true).with_writer(writer))
            .try_init()?,
    }

    Ok(Some(guard))
}

fn build_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let log_level = parse_log_level(level)?;
    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string())))
}

/// Parse log level string to tracing Level
pub fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(anyhow::anyhow!("Invalid log level: {level}")),
    }
}
