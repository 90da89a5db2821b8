//! Logging configuration using tracing

use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

const LOG_FILE_NAME: &str = "doorlink.log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const DEFAULT_FILTER: &str =
    "doorlink=info,doorlink_core=info,doorlink_channel=info,doorlink_app=info,warn";

/// Initialize the logging subsystem
///
/// Logs are written to `log_dir`, or `~/.local/share/doorlink/logs/` when no
/// directory is configured. With `stderr` set, the same events are mirrored to
/// the attached console.
/// Log level is controlled by `DOORLINK_LOG` environment variable.
///
/// # Examples
/// ```bash
/// DOORLINK_LOG=debug doorlink
/// DOORLINK_LOG=doorlink_app=trace doorlink --stderr
/// ```
pub fn init(log_dir: Option<&Path>, stderr: bool) -> Result<()> {
    let log_dir = log_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(default_log_directory);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_NAME);

    // Default to info, allow override via DOORLINK_LOG
    let env_filter = EnvFilter::try_from_env("DOORLINK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console = stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(fmt::time::ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(TIMESTAMP_FORMAT.to_string())),
        )
        .with(console)
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("doorlink {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Get the default log directory path
pub fn default_log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("doorlink").join("logs")
}

/// Get the base path of the rolling log file
///
/// The appender adds a date suffix to this name for each day's file.
pub fn current_log_file(log_dir: Option<&Path>) -> PathBuf {
    log_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(default_log_directory)
        .join(LOG_FILE_NAME)
}
