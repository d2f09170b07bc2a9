// src/interception/request.rs
//! Canonical request
//!
//! Identity (id, method, url, headers, credentials, body) is immutable once
//! built. The only mutable part is the resolution slot behind
//! [`InterceptedRequest::respond_with`], which accepts exactly one write.
//!
//! ```text
//! AwaitingResolution ──respond_with──▶ Responded ──settle──▶ Mocked
//!         │
//!         └────────────settle───────────────────────────────▶ Passthrough
//! ```

use crate::interception::headers::Headers;
use crate::interception::response::InterceptedResponse;
use crate::utils::errors::{InterceptorError, Result, TransportError};
use bytes::Bytes;
use hyper::Method;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;
use url::Url;
use uuid::Uuid;

/// Credentials policy attached to a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Credentials::Omit => "omit",
            Credentials::SameOrigin => "same-origin",
            Credentials::Include => "include",
        };
        f.write_str(value)
    }
}

/// Observable resolution state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Listeners are still running, nobody has responded yet
    AwaitingResolution,
    /// A listener supplied a response; the adapter has not applied it yet
    Responded,
    /// The mocked response was handed to the transport
    Mocked,
    /// No listener responded; the request went to the network
    Passthrough,
}

#[derive(Debug)]
enum Resolution {
    Pending,
    Responded(InterceptedResponse),
    Mocked,
    Passthrough,
}

#[derive(Debug)]
struct RequestInner {
    id: Uuid,
    method: Method,
    url: Url,
    headers: Headers,
    credentials: Credentials,
    body: Bytes,
    resolution: Mutex<Resolution>,
}

/// A transport-agnostic outgoing request
///
/// Cloning is cheap and every clone shares the same resolution slot.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    inner: Arc<RequestInner>,
}

impl InterceptedRequest {
    pub fn builder(method: Method, url: Url) -> RequestBuilder {
        RequestBuilder {
            id: None,
            method,
            url,
            headers: Headers::new(),
            credentials: Credentials::default(),
            body: Bytes::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    pub fn headers(&self) -> &Headers {
        &self.inner.headers
    }

    pub fn credentials(&self) -> Credentials {
        self.inner.credentials
    }

    /// Fully buffered request body; empty when nothing was sent
    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.inner.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.inner.body)?)
    }

    /// Resolve this request with a mocked response
    ///
    /// Fails if a response was already supplied, or if the request has already
    /// fallen through to the network.
    pub fn respond_with(&self, response: InterceptedResponse) -> Result<()> {
        let mut resolution = self.inner.resolution.lock();
        match *resolution {
            Resolution::Pending => {
                *resolution = Resolution::Responded(response);
                Ok(())
            }
            Resolution::Responded(_) | Resolution::Mocked => {
                warn!("respond_with called twice for request {}", self.inner.id);
                Err(InterceptorError::AlreadyResponded {
                    request_id: self.inner.id,
                })
            }
            Resolution::Passthrough => {
                warn!(
                    "respond_with called after request {} fell through to the network",
                    self.inner.id
                );
                Err(InterceptorError::RequestSettled {
                    request_id: self.inner.id,
                })
            }
        }
    }

    pub fn state(&self) -> RequestState {
        match *self.inner.resolution.lock() {
            Resolution::Pending => RequestState::AwaitingResolution,
            Resolution::Responded(_) => RequestState::Responded,
            Resolution::Mocked => RequestState::Mocked,
            Resolution::Passthrough => RequestState::Passthrough,
        }
    }

    /// Close the resolution slot and decide the outcome
    ///
    /// Returns the mocked response if a listener supplied one. Otherwise the
    /// request is marked as passthrough and later `respond_with` calls fail.
    pub(crate) fn settle(&self) -> Option<InterceptedResponse> {
        let mut resolution = self.inner.resolution.lock();
        match std::mem::replace(&mut *resolution, Resolution::Passthrough) {
            Resolution::Pending => None,
            Resolution::Responded(response) => {
                *resolution = Resolution::Mocked;
                Some(response)
            }
            Resolution::Mocked => {
                *resolution = Resolution::Mocked;
                None
            }
            Resolution::Passthrough => None,
        }
    }
}

/// Builder for [`InterceptedRequest`]
#[derive(Debug)]
pub struct RequestBuilder {
    id: Option<Uuid>,
    method: Method,
    url: Url,
    headers: Headers,
    credentials: Credentials,
    body: Bytes,
}

impl RequestBuilder {
    /// Reuse an existing identifier (requests relayed from another process)
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> InterceptedRequest {
        InterceptedRequest {
            inner: Arc::new(RequestInner {
                id: self.id.unwrap_or_else(Uuid::new_v4),
                method: self.method,
                url: self.url,
                headers: self.headers,
                credentials: self.credentials,
                body: self.body,
                resolution: Mutex::new(Resolution::Pending),
            }),
        }
    }
}

/// Normalize a method name: case-insensitive, upper-cased
///
/// A name that is not a valid HTTP token is rejected rather than guessed.
pub(crate) fn normalize_method(method: &str) -> std::result::Result<Method, TransportError> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| TransportError::InvalidRequest(format!("invalid HTTP method {:?}", method)))
}
