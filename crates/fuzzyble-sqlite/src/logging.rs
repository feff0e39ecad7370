//! Logging setup with fuzzyble segment prefixes.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with fuzzyble defaults.
///
/// Sets up tracing-subscriber with:
/// - Environment filter (RUST_LOG)
/// - Compact format suitable for terminal output
///
/// Does nothing if a global subscriber is already installed.
pub fn init() {
    init_with_filter("info");
}

/// Initialize tracing with a custom default filter.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

/// Segment prefixes for log lines.
pub mod prefix {
    /// Database operations prefix
    pub const DB: &str = "⊔";
    /// Index population prefix
    pub const POPULATE: &str = "꩜";
}
