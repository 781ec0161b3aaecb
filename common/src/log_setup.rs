use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Keeps the background file writer alive until the process exits.
static FILE_WRITER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_DIR: &str = "logs";
const KEPT_LOG_FILES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum LogSetupError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },
    #[error("Cannot create log directory 'logs': {0}")]
    CreateDir(#[source] std::io::Error),
    #[error("Cannot open rolling log file: {0}")]
    Appender(String),
    #[error("Logging is already set up")]
    AlreadyInitialized,
}

/// Sends log records to stderr and to `logs/<file_prefix>.<date>.log`.
///
/// `RUST_LOG` overrides `base_level`. Stdout stays free for program output.
pub fn setup_logging(base_level: &str, file_prefix: &str) -> Result<(), LogSetupError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(base_level).map_err(|e| LogSetupError::InvalidFilter {
            filter: base_level.to_owned(),
            reason: e.to_string(),
        })?,
    };

    let file_writer = rolling_file_writer(file_prefix)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|_| LogSetupError::AlreadyInitialized)
}

fn rolling_file_writer(file_prefix: &str) -> Result<NonBlocking, LogSetupError> {
    std::fs::create_dir_all(Path::new(LOG_DIR)).map_err(LogSetupError::CreateDir)?;

    let appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_prefix)
        .filename_suffix("log")
        .max_log_files(KEPT_LOG_FILES)
        .build(LOG_DIR)
        .map_err(|e| LogSetupError::Appender(e.to_string()))?;

    let (writer, guard) = tracing_appender::non_blocking(appender);
    FILE_WRITER_GUARD
        .set(guard)
        .map_err(|_| LogSetupError::AlreadyInitialized)?;
    Ok(writer)
}
