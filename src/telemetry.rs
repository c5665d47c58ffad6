// src/telemetry.rs
// =============================================================================
// Logging setup for the binary.
//
// Logs go to stderr so that --json output on stdout stays machine-readable.
// RUST_LOG overrides the default filter.
// =============================================================================

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Filter used when RUST_LOG is not set
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info,sqli_crawler=debug"
    }
}

pub fn init_telemetry(verbose: bool) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose).into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
