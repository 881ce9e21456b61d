//! Process-wide tracing setup shared by the binaries.

pub mod tracing;

pub use tracing::{DEFAULT_FILTER, LogFormat};

/// Initialize tracing from the environment (`RUST_LOG`, `LOG_FORMAT`).
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    tracing::init_with(format, DEFAULT_FILTER);
}
