// src/transport/client_request.rs
//! Socket-level client request
//!
//! Mirrors the classic "options in, writable request out" client API:
//! build a [`ClientRequest`] from loose [`RequestOptions`], write the body in
//! as many chunks as needed, then `end()` it to get the [`IncomingMessage`].

use crate::adapters;
use crate::interception::headers::Headers;
use crate::interception::pool::{AdapterKind, Pool};
use crate::interception::request::normalize_method;
use crate::interception::url_resolver::{resolve_url, RequestOptions};
use crate::transport::network::{default_network, Network, NetworkRequest, NetworkResponse};
use crate::utils::errors::{InterceptorError, TransportError};
use bytes::{Bytes, BytesMut};
use hyper::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

/// Client that creates [`ClientRequest`]s
#[derive(Clone)]
pub struct HttpClient {
    pool: Arc<Pool>,
    network: Arc<dyn Network>,
}

impl HttpClient {
    pub fn new(pool: Arc<Pool>, network: Arc<dyn Network>) -> Self {
        Self { pool, network }
    }

    /// Start a request; nothing is sent until [`ClientRequest::end`]
    pub fn request(&self, options: RequestOptions) -> ClientRequest {
        let headers = options.headers.clone();
        ClientRequest {
            client: self.clone(),
            options,
            headers,
            chunks: Vec::new(),
        }
    }

    /// Convenience for a body-less request
    pub async fn get(&self, options: RequestOptions) -> Result<IncomingMessage, TransportError> {
        self.request(options).end().await
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(Pool::global(), default_network())
    }
}

/// Start a request on the global pool and default network
pub fn request(options: RequestOptions) -> ClientRequest {
    HttpClient::default().request(options)
}

/// An outgoing request that is still being written
pub struct ClientRequest {
    client: HttpClient,
    options: RequestOptions,
    headers: Headers,
    chunks: Vec<Bytes>,
}

impl ClientRequest {
    /// Upper-cased method; GET when the options carry none
    pub fn method(&self) -> Result<Method, TransportError> {
        normalize_method(self.options.method.as_deref().unwrap_or("GET"))
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> &mut Self {
        self.headers.set(name, value);
        self
    }

    pub fn get_header(&self, name: &str) -> Option<String> {
        self.headers.get(name)
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.remove(name);
        self
    }

    /// Queue a body chunk
    pub fn write(&mut self, chunk: impl Into<Bytes>) -> &mut Self {
        let chunk = chunk.into();
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
        self
    }

    /// Finish the request and wait for the response
    pub async fn end(self) -> Result<IncomingMessage, TransportError> {
        let method = self.method()?;
        match self.client.pool.emitter(AdapterKind::ClientRequest) {
            Some(emitter) => adapters::client_request::intercept(&emitter, self, method).await,
            None => self.send_native(method).await,
        }
    }

    /// Write a final chunk, then finish the request
    pub async fn end_with(mut self, chunk: impl Into<Bytes>) -> Result<IncomingMessage, TransportError> {
        self.write(chunk);
        self.end().await
    }

    /// All written chunks, coalesced
    pub(crate) fn body(&self) -> Bytes {
        match self.chunks.len() {
            0 => Bytes::new(),
            1 => self.chunks[0].clone(),
            _ => {
                let total = self.chunks.iter().map(Bytes::len).sum();
                let mut buffer = BytesMut::with_capacity(total);
                for chunk in &self.chunks {
                    buffer.extend_from_slice(chunk);
                }
                buffer.freeze()
            }
        }
    }

    pub(crate) fn url(&self) -> Url {
        resolve_url(&self.options)
    }

    /// The original, unintercepted implementation
    pub(crate) async fn send_native(
        self,
        method: Method,
    ) -> Result<IncomingMessage, TransportError> {
        let request = NetworkRequest {
            method,
            url: self.url(),
            body: self.body(),
            headers: self.headers,
        };

        let response = self.client.network.send(request).await?;
        Ok(IncomingMessage::from(response))
    }
}

/// A received response
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub status_code: u16,
    pub status_message: String,
    pub headers: Headers,
    body: Bytes,
}

impl IncomingMessage {
    pub(crate) fn new(status_code: u16, status_message: String, headers: Headers, body: Bytes) -> Self {
        Self {
            status_code,
            status_message,
            headers,
            body,
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, InterceptorError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

impl From<NetworkResponse> for IncomingMessage {
    fn from(response: NetworkResponse) -> Self {
        Self::new(
            response.status,
            response.status_text,
            response.headers,
            response.body,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        HttpClient::new(Pool::new(), default_network())
    }

    #[test]
    fn test_chunks_are_coalesced() {
        let mut request = client().request(RequestOptions::new().method("post"));
        request.write("hello").write("").write(", ").write(Bytes::from_static(b"world"));

        assert_eq!(request.body(), Bytes::from_static(b"hello, world"));
        assert_eq!(request.method().unwrap(), Method::POST);
    }

    #[tokio::test]
    async fn test_invalid_method_fails_before_sending() {
        let pool = Pool::new();
        let client = HttpClient::new(Arc::clone(&pool), default_network());
        let interceptor = crate::interception::Interceptor::with_pool(
            [AdapterKind::ClientRequest],
            pool,
        );
        let seen = Arc::new(std::sync::atomic::AtomicBool::new(false));
        {
            let seen = Arc::clone(&seen);
            interceptor.on_request_sync(move |_| seen.store(true, std::sync::atomic::Ordering::SeqCst));
        }
        interceptor.apply();

        let result = client
            .request(RequestOptions::new().method("GE T"))
            .end()
            .await;
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
        assert!(!seen.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_headers_from_options() {
        let mut request = client().request(
            RequestOptions::new()
                .header("X-Custom", "a")
                .header("Accept", "text/plain"),
        );
        request.set_header("x-custom", "b");
        request.remove_header("accept");

        assert_eq!(request.get_header("X-Custom").as_deref(), Some("b"));
        assert!(request.get_header("accept").is_none());
    }

    #[test]
    fn test_url_is_resolved_from_options() {
        let request = client().request(RequestOptions {
            hostname: Some("127.0.0.1".to_string()),
            port: Some(3000),
            path: Some("/user".to_string()),
            ..Default::default()
        });
        assert_eq!(request.url().as_str(), "http://127.0.0.1:3000/user");
    }
}
