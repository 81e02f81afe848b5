//! Logging utilities for watchdog components.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize tracing with sensible defaults.
///
/// Uses the RUST_LOG environment variable to control log levels.
/// Default level is INFO.
pub fn init() {
    init_with("info", false);
}

/// Initialize tracing with an explicit default level and format.
///
/// RUST_LOG still takes precedence over the configured level.
pub fn init_with(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}
