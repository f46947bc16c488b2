use crate::config::LOG_FILE_PREFIX;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// JSON lines into a daily rolling file under `log_dir`, plus a terse
/// stderr layer. `RUST_LOG` overrides the file filter. Keep the guard
/// alive for as long as logs should be flushed.
pub fn init(log_dir: &Path, verbose: bool) -> WorkerGuard {
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("failed to create log dir `{}`: {err}", log_dir.display());
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,natural_reminders=debug"));
    let console_filter = EnvFilter::new(if verbose { "info" } else { "warn" });

    let file_layer = fmt::layer()
        .json()
        .with_writer(writer)
        .with_filter(file_filter);
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    if let Err(err) = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
    {
        eprintln!("logging already initialized: {err}");
    }

    guard
}
