//! Process-wide tracing setup for identity services and tests.

/// Initialize process-wide tracing with the format named by
/// `IDENTITY_LOG_FORMAT` (JSON unless set to `pretty`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}

/// Log output format.
pub mod format;

/// Subscriber installation (filters, layers).
pub mod tracing;

pub use format::{LogFormat, ParseLogFormatError};
