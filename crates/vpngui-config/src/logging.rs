// ── Tracing setup ──
//
// File logging driven by the persisted `log_level` setting. `RUST_LOG`
// takes precedence when set.

use std::path::Path;

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::ConfigError;

/// Normalize a persisted level name. `warning` and `fatal` are accepted
/// as aliases for `warn` and `error`.
pub fn canonical_level(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "fatal" => Some("error"),
        _ => None,
    }
}

/// Install the global subscriber writing to `log_file`.
///
/// Unknown levels fall back to `info` and are logged once the subscriber
/// is up. The returned guard flushes the background writer on drop and
/// must be held for the life of the process.
pub fn init_tracing(level: &str, log_file: &Path) -> Result<WorkerGuard, ConfigError> {
    let canonical = canonical_level(level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(canonical.unwrap_or("info")));

    let dir = log_file.parent().unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .ok_or_else(|| ConfigError::Validation {
            field: "log_file".into(),
            reason: format!("'{}' has no file name", log_file.display()),
        })?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .try_init()?;

    if canonical.is_none() {
        warn!(level, "unknown log level, falling back to info");
    }
    Ok(guard)
}
