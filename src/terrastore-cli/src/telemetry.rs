//! Logging setup for the command line client
//!
//! - Human-readable or JSON console output on stderr
//! - Optional JSON log files with size and daily rotation (10MB per file)

use anyhow::{Context, Result};
use rolling_file::{RollingConditionBasic, RollingFileAppender};
use std::path::Path;
use terrastore_core::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// Returns the file writer guard when file logging is enabled; keep it alive
/// until exit so buffered lines are flushed.
pub fn init_telemetry(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let env_filter = if verbose {
        EnvFilter::new("terrastore=debug,terrastore_rs=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let log_dir = Path::new(dir);
            std::fs::create_dir_all(log_dir)
                .with_context(|| format!("Failed to create log directory {}", dir))?;

            // terrastore.log, rotated daily or at 10MB, up to 10 files per day
            let file_appender = RollingFileAppender::new(
                log_dir.join("terrastore.log"),
                RollingConditionBasic::new().daily().max_size(10 * 1024 * 1024),
                9,
            )?;
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(true)
                .with_target(true)
                .with_thread_ids(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let json_console = config.json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
    });
    let text_console = (!config.json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(json_console)
        .with(text_console)
        .try_init()?;

    if let Some(dir) = &config.log_dir {
        tracing::debug!("File logging to {}", dir);
    }

    Ok(guard)
}
