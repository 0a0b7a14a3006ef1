//! File logging through `tracing`
//!
//! Command output owns stdout, so diagnostics go to a daily-rolling file.
//! The filter comes from `ADBM_LOG`, e.g. `ADBM_LOG=debug adbm list` or
//! `ADBM_LOG=adbm_app=trace adbm activate 10.0.0.5:37000`.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Result, ResultExt};

pub const LOG_ENV: &str = "ADBM_LOG";

const DEFAULT_FILTER: &str = "adb_mirror=info,adbm_app=info,adbm_daemon=info,warn";
const LOG_FILE_PREFIX: &str = "adbm.log";

/// Install the global subscriber; call once at startup
pub fn init() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_layer = fmt::layer()
        .with_writer(RollingFileAppender::new(
            Rotation::DAILY,
            &log_dir,
            LOG_FILE_PREFIX,
        ))
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ));

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .init();

    tracing::info!("adb-mirror starting, logging to {}", log_dir.display());
    Ok(())
}

/// Directory holding the daily log files (`adbm.log.YYYY-MM-DD`)
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("adb-mirror")
        .join("logs")
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
