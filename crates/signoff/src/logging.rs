//! Global tracing setup.
//!
//! Storage code logs through the `log` facade; `tracing-log` forwards those
//! records into the same subscriber as the engine's spans.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,

    #[error("Failed to bridge log records: {0}")]
    LogBridge(String),
}

/// Installs the global subscriber. `RUST_LOG` overrides `config.level`.
///
/// Fails if a subscriber is already installed, so call it once at startup.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| LoggingError::InvalidFilter {
            directive: config.level.clone(),
            reason: e.to_string(),
        })?,
    };

    let (json_layer, plain_layer) = if config.json {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            ),
            None,
        )
    } else {
        (None, Some(tracing_subscriber::fmt::layer().with_target(true)))
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    tracing_log::LogTracer::init().map_err(|e| LoggingError::LogBridge(e.to_string()))?;

    tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}
