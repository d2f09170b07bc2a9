// src/utils/errors.rs
//! Error types
//!
//! Two families are kept apart on purpose:
//!
//! - [`InterceptorError`] covers misuse of the interception API (a second
//!   `respond_with`, XHR calls in the wrong state) and bridge/config problems.
//! - [`TransportError`] is what a real network call produces. Adapters hand it
//!   back through the transport's own error channel without rewriting it.

use thiserror::Error;
use uuid::Uuid;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, InterceptorError>;

/// Errors raised by the interception layer itself
#[derive(Debug, Error)]
pub enum InterceptorError {
    /// `respond_with` was called on a request that already has a response
    #[error("request {request_id} has already been responded to")]
    AlreadyResponded { request_id: Uuid },

    /// `respond_with` was called after the request fell through to the network
    #[error("request {request_id} is already settled and can no longer be mocked")]
    RequestSettled { request_id: Uuid },

    /// A native transport object was driven out of order
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The inter-process channel failed or carried a malformed message
    #[error("bridge error: {0}")]
    Bridge(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors produced by the real network stack
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, DNS or protocol failure reported by the HTTP client
    #[error("request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read response body: {0}")]
    Body(#[from] hyper::Error),

    #[error("request timed out after {0}ms")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_misuse_messages_carry_request_id() {
        let id = Uuid::new_v4();
        let err = InterceptorError::AlreadyResponded { request_id: id };
        assert!(err.to_string().contains(&id.to_string()));

        let err = InterceptorError::RequestSettled { request_id: id };
        assert!(err.to_string().contains("settled"));
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let err: InterceptorError = TransportError::Timeout(250).into();
        assert_eq!(err.to_string(), "request timed out after 250ms");
    }
}
