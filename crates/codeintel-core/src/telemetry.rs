//! Tracing subscriber setup for embedding processes.

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install a global fmt subscriber filtered by `config.log_filter`.
///
/// Returns false when a global subscriber is already installed (a second
/// call, or a host that configured its own). An unparsable filter falls back
/// to `info`.
pub fn init_tracing(config: &Config) -> bool {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
