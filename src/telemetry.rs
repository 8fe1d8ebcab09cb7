//! Tracing setup helper.

use tracing_subscriber::EnvFilter;

/// Install a process-wide fmt subscriber honoring `RUST_LOG`, with `filter`
/// as the fallback directive. Safe to call more than once; later calls are
/// no-ops.
pub fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.to_string()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}
