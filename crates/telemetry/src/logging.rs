//! Structured logging setup.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prefix of the rotated log files (`automacao.YYYY-MM-DD.log`).
pub const LOG_FILE_PREFIX: &str = "automacao";

/// Rotated files kept on disk.
pub const MAX_LOG_FILES: usize = 5;

/// Initialize logging to the console and to a daily rotated JSON file.
///
/// # Arguments
/// * `log_level` - Optional filter override (e.g., "info", "debug", "repasse_workflow=trace")
/// * `log_dir` - Directory for the rotated log files, created if missing
///
/// # Returns
/// The file writer guard. Dropping it flushes and stops the background writer,
/// so keep it alive until the process exits.
pub fn init_logging(log_level: Option<&str>, log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    let filter = if let Some(level) = log_level {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    std::fs::create_dir_all(log_dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().json().with_ansi(false).with_writer(file_writer))
        .try_init()?;

    tracing::info!("{}", "=".repeat(80));
    tracing::info!("Starting repasse automation log session");
    tracing::info!("{}", "=".repeat(80));

    Ok(guard)
}
