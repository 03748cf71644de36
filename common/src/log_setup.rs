//! Tracing subscriber setup for binaries and demos.
//!
//! Libraries in this workspace only emit `tracing` events; installing a
//! subscriber is left to the executable.

use std::path::Path;
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs console + daily rolling file logging under `logs/`.
///
/// `RUST_LOG` takes precedence over `base_level` when it is set.
pub fn setup_logging(base_level: &str) {
    setup_logging_in(base_level, Path::new("logs"), "adacoloc");
}

/// Like [`setup_logging`], with an explicit log directory and file prefix.
///
/// # Panics
///
/// Panics if the filter is invalid, the directory cannot be created or a
/// global subscriber is already installed.
pub fn setup_logging_in(base_level: &str, log_dir: &Path, file_prefix: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(base_level))
        .unwrap_or_else(|e| panic!("Invalid log filter: {}", e));

    std::fs::create_dir_all(log_dir)
        .unwrap_or_else(|e| panic!("Failed to create {}: {}", log_dir.display(), e));

    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix(file_prefix)
        .filename_suffix("log")
        .max_log_files(5)
        .build(log_dir)
        .unwrap_or_else(|e| panic!("Failed to create log file appender: {}", e));

    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).expect("Logging already initialized");

    let console_writer = std::io::stdout.and(std::io::stderr.with_min_level(Level::WARN));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_ansi(true)
        .with_writer(console_writer);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .unwrap_or_else(|e| panic!("Logger initialization failed: {}", e));
}
