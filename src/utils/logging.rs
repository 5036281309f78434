use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the tracing subscriber. The filter comes from
/// `STOREFRONT_LOG`, defaulting to `info`.
pub fn init() {
    let fmt_layer = fmt::layer().compact().with_target(false);
    let filter =
        EnvFilter::try_from_env("STOREFRONT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
