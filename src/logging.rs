//! Logging configuration.
//!
//! Initializes a `tracing-subscriber` with file or stderr output.
//!
//! ## Configuration priority
//!
//! 1. `log_level` / `log_file` from [`crate::config::Config`] (or `SQLMETA_LOG` / `SQLMETA_LOG_FILE`)
//! 2. `RUST_LOG` environment variable
//! 3. Default: `warn`

use std::sync::OnceLock;
use tracing_subscriber::{
    fmt::{self, time::SystemTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Log level: "off", "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path. If unset, logs go to stderr.
    pub file: Option<String>,
}

/// Filter for the configured level; `None` when logging is switched off.
fn build_filter(config: &LogConfig) -> Option<EnvFilter> {
    match config.level.as_deref() {
        Some(level) if level.eq_ignore_ascii_case("off") => None,
        Some(level) => Some(EnvFilter::new(format!("sqlmeta={}", level.to_lowercase()))),
        None => Some(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sqlmeta=warn"))),
    }
}

/// Initialize the tracing subscriber.
///
/// Uses `OnceLock` to ensure this is called at most once per process;
/// subsequent calls are no-ops.
pub fn init_logging(config: &LogConfig) {
    LOGGING_INITIALIZED.get_or_init(|| {
        let Some(filter) = build_filter(config) else {
            return;
        };

        if let Some(ref path) = config.file {
            let file = match std::fs::OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("sqlmeta: failed to open log file {}: {}", path, e);
                    return;
                }
            };

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(file)
                        .with_target(false)
                        .with_ansi(false)
                        .with_timer(SystemTime),
                )
                .try_init()
                .ok();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_timer(SystemTime),
                )
                .try_init()
                .ok();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_off_disables_filter() {
        let config = LogConfig {
            level: Some("OFF".to_string()),
            file: None,
        };
        assert!(build_filter(&config).is_none());
    }

    #[test]
    fn test_explicit_level() {
        let config = LogConfig {
            level: Some("DEBUG".to_string()),
            file: None,
        };
        let filter = build_filter(&config).unwrap();
        assert_eq!(filter.to_string(), "sqlmeta=debug");
    }

    #[test]
    fn test_init_to_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlmeta.log");
        let config = LogConfig {
            level: Some("info".to_string()),
            file: Some(path.to_string_lossy().to_string()),
        };
        init_logging(&config);
        init_logging(&config);
        assert!(LOGGING_INITIALIZED.get().is_some());
    }
}
