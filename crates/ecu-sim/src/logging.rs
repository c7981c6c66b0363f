//! Logging Setup

use tracing_subscriber::EnvFilter;

/// Initialize logging
///
/// `RUST_LOG` overrides the default `info` level (`debug` when `verbose`).
/// Output goes to stderr so stdout stays free for command results. Calling
/// this more than once keeps the first subscriber.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
