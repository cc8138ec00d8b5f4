//! Logging Infrastructure
//!
//! `tracing` fmt subscriber filtered by `RUST_LOG`, falling back to the
//! configured level. With a log directory, output goes to a daily rolling
//! file instead of stdout.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the global logger
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger(log_level: &str, log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::daily(dir, "print-server");
                let _ = subscriber
                    .with_ansi(false)
                    .with_writer(file_appender)
                    .try_init();
                return;
            }
            Err(e) => {
                eprintln!(
                    "Cannot create log directory {}: {}, logging to stdout",
                    dir.display(),
                    e
                );
            }
        }
    }

    let _ = subscriber.try_init();
}
