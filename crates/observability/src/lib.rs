//! Tracing/logging setup shared by the binaries.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(mode: tracing::LogMode) {
    tracing::init(mode);
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::LogMode;
