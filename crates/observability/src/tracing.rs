//! Tracing/logging initialization.
//!
//! Every record is one JSON line on stderr. Development records also carry
//! source locations and the current span.

use tracing_subscriber::EnvFilter;

/// Output verbosity of the process.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LogMode {
    /// Compact records without source locations.
    Production,
    /// Records with source locations; error reports also carry the full error chain.
    #[default]
    Development,
}

impl LogMode {
    pub fn from_production_flag(production: bool) -> Self {
        if production {
            LogMode::Production
        } else {
            LogMode::Development
        }
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(mode: LogMode) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // JSON logs + timestamps, configurable via RUST_LOG.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .flatten_event(true)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match mode {
        LogMode::Production => builder.with_current_span(false).try_init(),
        LogMode::Development => builder
            .with_file(true)
            .with_line_number(true)
            .with_current_span(true)
            .try_init(),
    };
}
