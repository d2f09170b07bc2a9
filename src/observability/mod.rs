// src/observability/mod.rs
//! Tracing setup
//!
//! Output always goes to stderr: the child side of the remote bridge owns
//! stdout for protocol frames.

use crate::utils::config::LoggingConfig;
use crate::utils::errors::{InterceptorError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| InterceptorError::InvalidState(format!("Invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| InterceptorError::InvalidState(format!("Tracing already initialized: {}", e)))
}
