use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "taskdeck=info";
const LOG_FILE_PREFIX: &str = "taskdeck.log";

/// Installs the global subscriber: stderr plus a daily-rolling file under
/// `logs_dir`. Keep the returned guard alive until shutdown so buffered lines
/// are flushed.
pub fn init_logging(logs_dir: &Path) -> Result<WorkerGuard, InfraError> {
    fs::create_dir_all(logs_dir)?;
    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .map_err(|error| {
            InfraError::InvalidConfig(format!("logging already initialized: {error}"))
        })?;
    Ok(guard)
}
