//! Logging Infrastructure
//!
//! Structured logging setup for the kiosk host process and tests.
//! `RUST_LOG` overrides the level passed in.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` if set, otherwise `level` (invalid values fall back to info)
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional daily-rolling file output
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(level_filter(level))
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.exists()
            && let Some(dir_str) = log_path.to_str()
        {
            let file_appender = tracing_appender::rolling::daily(dir_str, "queue-engine");
            let _ = subscriber.with_writer(file_appender).try_init();
            return;
        }
        let _ = subscriber.try_init();
        tracing::warn!(log_dir = %dir, "Log directory does not exist, logging to stdout");
        return;
    }

    let _ = subscriber.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_accepts_directives() {
        // RUST_LOG may be set by the harness, only check that parsing never panics
        let _ = level_filter("debug");
        let _ = level_filter("queue_engine=trace,info");
        let _ = level_filter("not a level ===");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logger_with_file(Some("debug"), None);
        init_logger();
        tracing::debug!("logger initialized twice");
    }
}
