// src/utils/config.rs
//! Configuration loading
//!
//! Values come from an optional `interceptor.{toml,yaml,json}` file in the
//! working directory, then from `INTERCEPTOR__*` environment variables
//! (e.g. `INTERCEPTOR__NETWORK__CONNECT_TIMEOUT_MS=500`).

use crate::utils::errors::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InterceptorConfig {
    /// Real network stack used for passthrough
    pub network: NetworkConfig,

    /// Remote bridge framing
    pub bridge: BridgeConfig,

    /// Tracing output
    pub logging: LoggingConfig,
}

/// Settings for the passthrough HTTP client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Whole-request timeout in milliseconds (unset = wait as long as the server does)
    pub request_timeout_ms: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            request_timeout_ms: None,
        }
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Settings for the inter-process bridge
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Largest accepted line on the wire, in bytes
    pub max_frame_length: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_frame_length: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl InterceptorConfig {
    /// Load configuration from the default file (if any) and the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("interceptor").required(false))
            .add_source(config::Environment::with_prefix("INTERCEPTOR").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load configuration from an explicit file, still honoring the environment
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("INTERCEPTOR").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
