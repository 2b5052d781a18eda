//! # Application Logging
//!
//! Console output plus an optional per-run controller log file.

use chrono::Local;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{ResourceError, Result};
use crate::session::manager::FILE_TIMESTAMP_FORMAT;

/// File name of the controller log for a run started now
pub fn log_file_name() -> String {
    format!("controller_{}.log", Local::now().format(FILE_TIMESTAMP_FORMAT))
}

/// Filter from `RUST_LOG`, falling back to the configured level
fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn create_log_dir(dir: &Path) -> std::result::Result<(), ResourceError> {
    std::fs::create_dir_all(dir).map_err(|source| ResourceError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer when dropped and must be held
/// for the lifetime of the process.
///
/// # Errors
///
/// Returns `ArmSentryError::Resource` if the log directory cannot be created
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = if config.file_enabled {
        let dir = Path::new(&config.log_dir);
        create_log_dir(dir)?;

        let appender = tracing_appender::rolling::never(dir, log_file_name());
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter(&config.level))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
