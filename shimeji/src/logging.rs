//! Development-time tracing.
//!
//! Output goes to stderr and never mixes with console replies on stdout.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; falls back to `default_filter` (the runtime config's
/// `log_filter`) and then to `warn` if that does not parse.
///
/// # Example
/// ```bash
/// RUST_LOG=shimeji=debug shimeji --root ~/shimeji run
/// ```
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
