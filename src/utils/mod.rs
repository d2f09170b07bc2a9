// src/utils/mod.rs
//! Common utilities shared across the crate

pub mod config;
pub mod errors;

pub use config::{BridgeConfig, InterceptorConfig, LoggingConfig, NetworkConfig};
pub use errors::{InterceptorError, Result, TransportError};
