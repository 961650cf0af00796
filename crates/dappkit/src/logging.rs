//! Logging setup shared by dappkit consumers

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global tracing subscriber reading the `RUST_LOG` environment
/// variable, falling back to `info` when unset.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
