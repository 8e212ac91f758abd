//! Logging infrastructure for parley
//!
//! Logs are written to `~/.local/state/parley/parley.log` following XDG
//! standards, so they never interleave with the chat on stdout.
//!
//! The configured level applies to parley's own crates. Dependencies (the
//! HTTP stack, the Redis client) stay at `warn` unless `RUST_LOG` says
//! otherwise, since their debug output would drown out turn and store events.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use crate::types::SessionId;
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Crates whose events follow the configured level.
const OWN_TARGETS: [&str; 2] = ["parley", "parley_core"];

/// Initialize the logging system
///
/// Sets up tracing with:
/// - File output to XDG state directory
/// - Daily log rotation
/// - The configured level for parley itself, `warn` for dependencies
/// - Full override through `RUST_LOG`
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let directives = filter_directives(&config.level)?;
    let log_dir = Config::state_dir();

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "parley.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install logger: {}", e)))?;

    tracing::info!(
        log_dir = %log_dir.display(),
        directives = %directives,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Build the filter for a configured level: that level for parley's crates,
/// `warn` for everything else.
///
/// Levels are matched case-insensitively. Anything else is a config error
/// rather than a silently ignored directive.
pub fn filter_directives(level: &str) -> Result<String> {
    let level = level.trim().to_ascii_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(Error::Config(format!(
            "logging.level must be one of {}, got '{}'",
            LEVELS.join(", "),
            level
        )));
    }

    let mut directives = vec!["warn".to_string()];
    directives.extend(OWN_TARGETS.iter().map(|target| format!("{}={}", target, level)));
    Ok(directives.join(","))
}

/// Span that tags every event of a chat with its session.
///
/// Only the short form of the id is recorded; the full id is logged once when
/// the chat starts.
pub fn session_span(session_id: &SessionId) -> tracing::Span {
    tracing::info_span!("session", id = %session_id.short())
}

/// Initialize logging for tests (logs to the test writer)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any pending log writes.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Returns the log file path
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}
