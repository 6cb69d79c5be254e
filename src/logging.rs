//! Logging initialization
//!
//! Logs go to stderr so stdout carries nothing but the account CSV. `RUST_LOG`
//! takes precedence over the level passed on the command line.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
