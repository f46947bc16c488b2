pub mod app;
pub mod category;
pub mod cli;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod notifier;
pub mod output;
pub mod reconcile;
pub mod recurrence;
pub mod reminder;
pub mod scheduler;
pub mod service;
pub mod settings;
pub mod storage;

pub use error::{AppError, AppResult};
pub use reconcile::{ReconcileReport, Reconciler};
pub use recurrence::next_occurrence;
pub use reminder::{Recurrence, RecurrenceKind, Reminder};

use clap::Parser;
use std::time::Duration;

pub fn run() {
    let cli = cli::Cli::parse();

    let data_dir = match cli.data_dir.clone().map(Ok).unwrap_or_else(app::App::default_data_dir) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let log_guard = logging::init(&data_dir.join("logs"), cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    let result = runtime.block_on(cli.execute(data_dir));
    // stdin reads run on a blocking thread that never returns on its own
    runtime.shutdown_timeout(Duration::from_millis(500));

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        drop(log_guard);
        std::process::exit(1);
    }
}
