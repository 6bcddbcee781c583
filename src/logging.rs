//! Tracing setup for the binary
//!
//! Human-readable events go to stderr so stdout stays clean for JSON
//! responses; the same events are appended to `<base>/logs/cache-cleaner.log`.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::CleanerPaths;
use crate::error::{CleanerError, CleanerResult};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "CACHE_CLEANER_LOG";

pub const LOG_FILE_NAME: &str = "cache-cleaner.log";

/// Install the global subscriber
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the life of the process. Calling this twice leaves the first
/// subscriber in place.
pub fn init_logging(paths: &CleanerPaths, default_level: &str) -> CleanerResult<WorkerGuard> {
    let logs_dir = paths.logs_dir();
    std::fs::create_dir_all(&logs_dir).map_err(|e| {
        CleanerError::Io(format!(
            "Failed to create log directory {}: {}",
            logs_dir.display(),
            e
        ))
    })?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_appender = tracing_appender::rolling::never(&logs_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter)
        .try_init();

    Ok(guard)
}
