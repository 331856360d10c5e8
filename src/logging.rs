use std::env;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr; stdout carries host commands.
pub fn init() {
    let filter = env::var("AAS_LOG")
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
