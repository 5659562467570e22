//! Logging setup for hosts that embed the crate without their own subscriber.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_LOG_DIRECTIVE: &str = "tcp_socket_core=info";

/// Install a formatted `tracing` subscriber filtered by `RUST_LOG`
///
/// Returns `false` if a global subscriber was already installed, in which case
/// nothing changes.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
