//! Logging setup: stderr always, plus a daily-rolling file when a log
//! directory is configured. Stdout is reserved for dry-run beacon output.

use fs_err as fs;
use std::env;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEBUG_ENV: &str = "LAUNCH_CONTROL_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "launch-control.log";

/// Installs the global subscriber. Keep the returned guard alive until exit
/// or buffered file output is lost.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = if debug_enabled() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let (file_layer, guard) = match log_dir.and_then(file_writer) {
        Some((writer, guard)) => (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn debug_enabled() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn file_writer(dir: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    if let Err(err) = fs::create_dir_all(dir) {
        // The subscriber isn't installed yet.
        eprintln!("launch-control: file logging disabled: {err}");
        return None;
    }
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}
