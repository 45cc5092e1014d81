//! Logging setup

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber: console output filtered by `RUST_LOG`
/// (default INFO and above)
pub fn init_logger() {
    let console_layer = fmt::Layer::new()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // try_init so a second call is a no-op instead of a panic
    if tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .try_init()
        .is_ok()
    {
        info!("Logger initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_logger();
        init_logger();
    }
}
