use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};
use time::macros::format_description;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const APP_NAME: &str = "allocation-gym";

// ================================================================================================
// Tracing Configuration
// ================================================================================================

/// JSON logs to stdout inside a container, to a timestamped file under the user's state
/// directory otherwise. Keep the returned guard alive until exit so buffered lines flush.
pub fn init_tracing() -> Result<Option<WorkerGuard>> {
    let in_container =
        env::var("CONTAINER").is_ok() || std::path::Path::new("/.dockerenv").exists();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if in_container {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .init();

        info!("Logging to stdout (container mode)");
        return Ok(None);
    }

    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)?;

    let timestamp = time::OffsetDateTime::now_utc()
        .format(&format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .context("Failed to format timestamp")?;
    let file_name = format!("{APP_NAME}-{timestamp}.log");
    let file_path = log_dir.join(&file_name);

    let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_current_span(true)
        .with_thread_ids(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(log_file = %file_path.display(), "Logging to file (local mode)");
    Ok(Some(guard))
}

fn log_dir() -> Result<PathBuf> {
    if let Some(mut dir) = dirs::state_dir() {
        dir.push(APP_NAME);
        dir.push("logs");
        return Ok(dir);
    }
    let mut home = dirs::home_dir().context("Failed to find home directory")?;
    home.push(format!(".local/state/{APP_NAME}/logs"));
    Ok(home)
}

/// Directory the demos write their artifacts to.
pub fn output_dir() -> PathBuf {
    PathBuf::from("demos/output")
}

pub fn scaler_path() -> PathBuf {
    output_dir().join("scaler.json")
}
