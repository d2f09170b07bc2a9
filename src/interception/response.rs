// src/interception/response.rs
//! Canonical response
//!
//! Produced either by a listener (mock) or converted from what the real
//! transport returned (passthrough). Once built, the two are indistinguishable.

use crate::interception::headers::Headers;
use crate::utils::errors::Result;
use bytes::Bytes;
use hyper::StatusCode;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl InterceptedResponse {
    /// Create a response with the canonical reason phrase and an empty body
    pub fn new(status: u16) -> Self {
        Self {
            status,
            status_text: reason_phrase(status),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

impl Default for InterceptedResponse {
    fn default() -> Self {
        Self::new(200)
    }
}

/// Reason phrase for a status code, empty for unknown codes
pub(crate) fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

/// Where a settled response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// A listener called `respond_with`
    Mock,
    /// The request went out to the real network
    Network,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let response = InterceptedResponse::default();
        assert_eq!(response.status, 200);
        assert_eq!(response.status_text, "OK");
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_builder() {
        let response = InterceptedResponse::new(404)
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"error":"missing"}"#);

        assert_eq!(response.status_text, "Not Found");
        assert_eq!(
            response.headers.get("content-type").as_deref(),
            Some("application/json")
        );

        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["error"], "missing");
    }

    #[test]
    fn test_unknown_status_has_empty_reason() {
        let response = InterceptedResponse::new(599);
        assert_eq!(response.status_text, "");

        let response = response.with_status_text("Custom");
        assert_eq!(response.status_text, "Custom");
    }
}
