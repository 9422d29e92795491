//! Process-wide logging setup shared by the binaries.

/// Subscriber configuration (format selection, env filter).
pub mod tracing;

pub use self::tracing::LogFormat;

/// Initialize process-wide logging using the format from `GATEHOUSE_LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init(LogFormat::from_env());
}
