use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Installs the JSON log subscriber used by both Lambda binaries.
///
/// Timestamps are left out because CloudWatch records the ingestion time.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
