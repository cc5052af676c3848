//! Logging setup
//!
//! Console tracing for the CLI. `RUST_LOG` wins when set; otherwise the
//! requested level filters everything. Events go to stderr so command
//! output stays clean on stdout.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber. Call once, before any tracing macro.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .init();
}
