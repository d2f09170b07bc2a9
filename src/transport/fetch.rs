// src/transport/fetch.rs
//! Global `fetch`
//!
//! Takes a pre-built URL and resolves to a fully buffered response. Network
//! failures are returned as the `Err` side, exactly as the native call
//! would report them.

use crate::adapters;
use crate::interception::headers::Headers;
use crate::interception::pool::{AdapterKind, Pool};
use crate::interception::request::{normalize_method, Credentials};
use crate::transport::network::{default_network, Network, NetworkRequest, NetworkResponse};
use crate::utils::errors::{InterceptorError, TransportError};
use bytes::Bytes;
use hyper::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

/// Input to [`Fetch::fetch`]
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Bytes>,
    pub credentials: Credentials,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: None,
            credentials: Credentials::default(),
        }
    }

    /// GET request from a URL string
    pub fn get(url: &str) -> Result<Self, TransportError> {
        Self::parse("GET", url)
    }

    /// Request from a method name (any case) and a URL string
    pub fn parse(method: &str, url: &str) -> Result<Self, TransportError> {
        let url = Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(Self::new(normalize_method(method)?, url))
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Output of [`Fetch::fetch`]
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub url: Url,
    body: Bytes,
}

impl FetchResponse {
    pub(crate) fn new(
        status: u16,
        status_text: String,
        headers: Headers,
        url: Url,
        body: Bytes,
    ) -> Self {
        Self {
            status,
            status_text,
            headers,
            url,
            body,
        }
    }

    pub(crate) fn from_network(response: NetworkResponse, url: Url) -> Self {
        Self::new(
            response.status,
            response.status_text,
            response.headers,
            url,
            response.body,
        )
    }

    /// Status in the 200-299 range
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, InterceptorError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// A fetch implementation bound to a pool and a network
#[derive(Clone)]
pub struct Fetch {
    pool: Arc<Pool>,
    network: Arc<dyn Network>,
}

impl Fetch {
    pub fn new(pool: Arc<Pool>, network: Arc<dyn Network>) -> Self {
        Self { pool, network }
    }

    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, TransportError> {
        match self.pool.emitter(AdapterKind::Fetch) {
            Some(emitter) => adapters::fetch::intercept(&emitter, self, request).await,
            None => self.fetch_native(request).await,
        }
    }

    /// The original, unintercepted implementation
    pub(crate) async fn fetch_native(
        &self,
        request: FetchRequest,
    ) -> Result<FetchResponse, TransportError> {
        let url = request.url.clone();
        let response = self
            .network
            .send(NetworkRequest {
                method: request.method,
                url: request.url,
                headers: request.headers,
                body: request.body.unwrap_or_default(),
            })
            .await?;

        Ok(FetchResponse::from_network(response, url))
    }
}

impl Default for Fetch {
    fn default() -> Self {
        Self::new(Pool::global(), default_network())
    }
}

/// `fetch` on the global pool and default network
pub async fn fetch(request: FetchRequest) -> Result<FetchResponse, TransportError> {
    Fetch::default().fetch(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = FetchRequest::parse("post", "http://localhost/user?id=1")
            .unwrap()
            .header("Content-Type", "application/json")
            .body(r#"{"a":1}"#)
            .credentials(Credentials::Include);

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url.query(), Some("id=1"));
        assert_eq!(request.credentials, Credentials::Include);
        assert!(request.body.is_some());
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            FetchRequest::get("not a url"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_invalid_method() {
        assert!(matches!(
            FetchRequest::parse("GE T", "http://localhost/"),
            Err(TransportError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_response_helpers() {
        let response = FetchResponse::new(
            201,
            "Created".to_string(),
            Headers::new(),
            Url::parse("http://localhost/").unwrap(),
            Bytes::from_static(br#"{"id":3}"#),
        );
        assert!(response.ok());
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["id"], 3);
    }
}
