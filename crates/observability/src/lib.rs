//! Logging setup shared by every binary in the workspace.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide logging using `LOG_FORMAT` and `RUST_LOG`.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
