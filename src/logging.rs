//! Logging configuration
//!
//! Structured logging with tracing. The subscriber is installed
//! explicitly by the binary; library code only emits events.

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Default filter when RUST_LOG is unset
const DEFAULT_FILTER: &str = "torrotate=info";

/// Initialize logging with environment-based filtering
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter);
}

/// Initialize logging at a specific level, ignoring the environment
pub fn init_with_level(level: Level) {
    install(EnvFilter::new(format!("torrotate={}", level)));
}

fn install(filter: EnvFilter) {
    fmt().with_env_filter(filter).with_target(true).init();
}
