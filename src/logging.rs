use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE: &str = "agenda.log";

/// Route tracing output to a daily rolling file under `<data_dir>/logs`.
///
/// The terminal belongs to the UI, so nothing is written to stdout. The
/// returned guard must stay alive until exit to flush buffered lines.
pub fn init_logging(data_dir: &Path, debug: bool) -> Result<WorkerGuard> {
    let log_dir = data_dir.join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if debug { "agenda_manager=debug" } else { "agenda_manager=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_target(debug).with_writer(writer))
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
