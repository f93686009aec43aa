use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Installs the global `fmt` subscriber. `RUST_LOG` overrides the default
/// `info` filter. Calling it twice is harmless: the second call is ignored.
pub fn trace_init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
    {
        tracing::trace!("Subscriber initialized.");
    }
}
