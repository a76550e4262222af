//! Tracing initialization

use tracing_subscriber::Registry;
use tracing_subscriber::layer::SubscriberExt;

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber from configuration.
///
/// `RUST_LOG` overrides the configured level when set. The `json` format is
/// meant for production log shipping; anything else gets the human-readable
/// fmt layer.
pub fn init_tracing(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    if config.format == "json" {
        let subscriber = Registry::default()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json());
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| format!("Failed to set global tracing subscriber: {e}"))?;
    } else {
        let subscriber = Registry::default()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer());
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| format!("Failed to set global tracing subscriber: {e}"))?;
    }

    Ok(())
}
