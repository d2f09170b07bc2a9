// src/transport/xhr.rs
//! Browser-style XMLHttpRequest
//!
//! State machine: `Unsent -> Opened -> HeadersReceived -> Loading -> Done`.
//!
//! ```text
//!   open()            send()                       response
//!     |                 |                              |
//!     v                 v                              v
//!   [1 Opened] --> loadstart --> (resolve) --> [2] -> [3] progress -> [4] load, loadend
//!                                     \
//!                                      +-- failure --> [4] status 0, error, loadend
//! ```
//!
//! Event callbacks are always invoked with no lock held, so a callback may
//! read the request's state freely.

use crate::adapters;
use crate::interception::headers::Headers;
use crate::interception::pool::{AdapterKind, Pool};
use crate::interception::request::normalize_method;
use crate::transport::network::{default_network, Network, NetworkRequest, NetworkResponse};
use crate::utils::errors::{InterceptorError, Result, TransportError};
use bytes::Bytes;
use hyper::Method;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

static DEFAULT_BASE_URL: Lazy<Url> =
    Lazy::new(|| Url::parse("http://localhost/").expect("static base URL is valid"));

/// `readyState` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ReadyState {
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

/// Events dispatched by an [`XmlHttpRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XhrEvent {
    ReadyStateChange,
    LoadStart,
    Progress,
    Load,
    Error,
    LoadEnd,
}

impl XhrEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadyStateChange => "readystatechange",
            Self::LoadStart => "loadstart",
            Self::Progress => "progress",
            Self::Load => "load",
            Self::Error => "error",
            Self::LoadEnd => "loadend",
        }
    }
}

impl fmt::Display for XhrEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type XhrCallback = Arc<dyn Fn(XhrEvent) + Send + Sync>;

/// What `send()` hands to the network or to the adapter
#[derive(Debug, Clone)]
pub(crate) struct XhrSend {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Bytes,
    pub with_credentials: bool,
}

/// A response ready to be delivered through the ready-state machine
#[derive(Debug, Clone)]
pub(crate) struct XhrResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl From<NetworkResponse> for XhrResponse {
    fn from(response: NetworkResponse) -> Self {
        Self {
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            body: response.body,
        }
    }
}

struct XhrState {
    ready_state: ReadyState,
    method: Method,
    url: Option<Url>,
    request_headers: Headers,
    with_credentials: bool,
    sent: bool,
    status: u16,
    status_text: String,
    response_headers: Headers,
    response: Bytes,
    listeners: Vec<(XhrEvent, XhrCallback)>,
}

impl Default for XhrState {
    fn default() -> Self {
        Self {
            ready_state: ReadyState::Unsent,
            method: Method::GET,
            url: None,
            request_headers: Headers::new(),
            with_credentials: false,
            sent: false,
            status: 0,
            status_text: String::new(),
            response_headers: Headers::new(),
            response: Bytes::new(),
            listeners: Vec::new(),
        }
    }
}

/// XMLHttpRequest handle; clones share the same request
#[derive(Clone)]
pub struct XmlHttpRequest {
    state: Arc<Mutex<XhrState>>,
    pool: Arc<Pool>,
    network: Arc<dyn Network>,
    base_url: Url,
}

impl XmlHttpRequest {
    /// New request on the global pool and default network
    pub fn new() -> Self {
        Self::with_transport(Pool::global(), default_network())
    }

    pub fn with_transport(pool: Arc<Pool>, network: Arc<dyn Network>) -> Self {
        Self {
            state: Arc::new(Mutex::new(XhrState::default())),
            pool,
            network,
            base_url: DEFAULT_BASE_URL.clone(),
        }
    }

    /// Base against which relative URLs passed to `open` are resolved
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn open(&self, method: &str, url: &str) -> Result<()> {
        let method = normalize_method(method)?;
        let url = self
            .base_url
            .join(url)
            .map_err(|e| InterceptorError::InvalidUrl(format!("{}: {}", url, e)))?;

        {
            let mut state = self.state.lock();
            let listeners = std::mem::take(&mut state.listeners);
            let with_credentials = state.with_credentials;
            *state = XhrState {
                ready_state: ReadyState::Opened,
                method,
                url: Some(url),
                with_credentials,
                listeners,
                ..Default::default()
            };
        }

        self.dispatch(XhrEvent::ReadyStateChange);
        Ok(())
    }

    pub fn set_request_header(&self, name: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.ready_state != ReadyState::Opened || state.sent {
            return Err(InterceptorError::InvalidState(
                "setRequestHeader requires an opened, unsent request".to_string(),
            ));
        }
        state.request_headers.append(name, value);
        Ok(())
    }

    pub fn set_with_credentials(&self, with_credentials: bool) {
        self.state.lock().with_credentials = with_credentials;
    }

    pub fn with_credentials(&self) -> bool {
        self.state.lock().with_credentials
    }

    pub fn add_event_listener<F>(&self, event: XhrEvent, callback: F)
    where
        F: Fn(XhrEvent) + Send + Sync + 'static,
    {
        self.state.lock().listeners.push((event, Arc::new(callback)));
    }

    /// Send the request and drive it to `Done`
    ///
    /// Network failures are reported through the `error` event and a zero
    /// status, never through the returned `Result`, which only covers misuse.
    pub async fn send(&self, body: Option<Bytes>) -> Result<()> {
        let request = {
            let mut state = self.state.lock();
            if state.ready_state != ReadyState::Opened || state.sent {
                return Err(InterceptorError::InvalidState(
                    "send requires an opened, unsent request".to_string(),
                ));
            }
            let url = state.url.clone().ok_or_else(|| {
                InterceptorError::InvalidState("request has no URL".to_string())
            })?;
            state.sent = true;

            XhrSend {
                method: state.method.clone(),
                url,
                headers: state.request_headers.clone(),
                body: body.unwrap_or_default(),
                with_credentials: state.with_credentials,
            }
        };

        self.dispatch(XhrEvent::LoadStart);

        let outcome = match self.pool.emitter(AdapterKind::XmlHttpRequest) {
            Some(emitter) => adapters::xhr::intercept(&emitter, self, request).await,
            None => self.send_native(request).await,
        };

        match outcome {
            Ok(response) => self.deliver(response),
            Err(e) => self.fail(&e),
        }
        Ok(())
    }

    /// The original, unintercepted network path
    pub(crate) async fn send_native(
        &self,
        request: XhrSend,
    ) -> std::result::Result<XhrResponse, TransportError> {
        let response = self
            .network
            .send(NetworkRequest {
                method: request.method,
                url: request.url,
                headers: request.headers,
                body: request.body,
            })
            .await?;
        Ok(XhrResponse::from(response))
    }

    /// Walk the response through the remaining ready states
    pub(crate) fn deliver(&self, response: XhrResponse) {
        {
            let mut state = self.state.lock();
            state.status = response.status;
            state.status_text = response.status_text;
            state.response_headers = response.headers;
            state.ready_state = ReadyState::HeadersReceived;
        }
        self.dispatch(XhrEvent::ReadyStateChange);

        self.state.lock().ready_state = ReadyState::Loading;
        self.dispatch(XhrEvent::ReadyStateChange);

        self.state.lock().response = response.body;
        self.dispatch(XhrEvent::Progress);

        self.state.lock().ready_state = ReadyState::Done;
        self.dispatch(XhrEvent::ReadyStateChange);
        self.dispatch(XhrEvent::Load);
        self.dispatch(XhrEvent::LoadEnd);
    }

    fn fail(&self, error: &TransportError) {
        debug!("XHR request failed: {}", error);
        {
            let mut state = self.state.lock();
            state.status = 0;
            state.status_text.clear();
            state.response_headers = Headers::new();
            state.response = Bytes::new();
            state.ready_state = ReadyState::Done;
        }
        self.dispatch(XhrEvent::ReadyStateChange);
        self.dispatch(XhrEvent::Error);
        self.dispatch(XhrEvent::LoadEnd);
    }

    fn dispatch(&self, event: XhrEvent) {
        let callbacks: Vec<XhrCallback> = self
            .state
            .lock()
            .listeners
            .iter()
            .filter(|(kind, _)| *kind == event)
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(event);
        }
    }

    pub fn ready_state(&self) -> ReadyState {
        self.state.lock().ready_state
    }

    pub fn status(&self) -> u16 {
        self.state.lock().status
    }

    pub fn status_text(&self) -> String {
        self.state.lock().status_text.clone()
    }

    /// Response header, available from `HeadersReceived` on
    pub fn get_response_header(&self, name: &str) -> Option<String> {
        let state = self.state.lock();
        if state.ready_state < ReadyState::HeadersReceived {
            return None;
        }
        state.response_headers.get(name)
    }

    /// All response headers as `name: value\r\n` lines
    pub fn get_all_response_headers(&self) -> String {
        let state = self.state.lock();
        if state.ready_state < ReadyState::HeadersReceived {
            return String::new();
        }
        state
            .response_headers
            .iter()
            .map(|(name, value)| format!("{}: {}\r\n", name, value))
            .collect()
    }

    pub fn response(&self) -> Bytes {
        self.state.lock().response.clone()
    }

    pub fn response_text(&self) -> String {
        String::from_utf8_lossy(&self.state.lock().response).into_owned()
    }
}

impl Default for XmlHttpRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for XmlHttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("XmlHttpRequest")
            .field("ready_state", &state.ready_state)
            .field("method", &state.method)
            .field("url", &state.url.as_ref().map(Url::as_str))
            .field("status", &state.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xhr() -> XmlHttpRequest {
        XmlHttpRequest::with_transport(Pool::new(), default_network())
    }

    #[test]
    fn test_open_resolves_relative_url() {
        let xhr = xhr().with_base_url(Url::parse("http://127.0.0.1:8080/app/").unwrap());
        xhr.open("get", "user?id=1").unwrap();

        let state = xhr.state.lock();
        assert_eq!(state.method, Method::GET);
        assert_eq!(
            state.url.as_ref().map(Url::as_str),
            Some("http://127.0.0.1:8080/app/user?id=1")
        );
        assert_eq!(state.ready_state, ReadyState::Opened);
    }

    #[test]
    fn test_header_requires_open() {
        let xhr = xhr();
        assert!(matches!(
            xhr.set_request_header("x-a", "1"),
            Err(InterceptorError::InvalidState(_))
        ));

        xhr.open("POST", "/echo").unwrap();
        xhr.set_request_header("X-A", "1").unwrap();
        xhr.set_request_header("x-a", "2").unwrap();
        assert_eq!(xhr.state.lock().request_headers.get("x-a").as_deref(), Some("1, 2"));
    }

    #[test]
    fn test_open_rejects_invalid_method() {
        let xhr = xhr();
        assert!(matches!(
            xhr.open("GE T", "/user"),
            Err(InterceptorError::Transport(TransportError::InvalidRequest(_)))
        ));
        assert_eq!(xhr.ready_state(), ReadyState::Unsent);
    }

    #[tokio::test]
    async fn test_send_requires_open() {
        let xhr = xhr();
        assert!(matches!(
            xhr.send(None).await,
            Err(InterceptorError::InvalidState(_))
        ));
    }

    #[test]
    fn test_deliver_walks_ready_states() {
        let xhr = xhr();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            let handle = xhr.clone();
            xhr.add_event_listener(XhrEvent::ReadyStateChange, move |_| {
                seen.lock().push(handle.ready_state() as u8);
            });
        }
        xhr.open("GET", "/").unwrap();

        let mut headers = Headers::new();
        headers.append("Content-Type", "text/plain");
        xhr.deliver(XhrResponse {
            status: 201,
            status_text: "Created".to_string(),
            headers,
            body: Bytes::from_static(b"made"),
        });

        assert_eq!(*seen.lock(), vec![1, 2, 3, 4]);
        assert_eq!(xhr.status(), 201);
        assert_eq!(xhr.response_text(), "made");
        assert_eq!(xhr.get_all_response_headers(), "content-type: text/plain\r\n");
    }

    #[test]
    fn test_headers_hidden_before_received() {
        let xhr = xhr();
        xhr.open("GET", "/").unwrap();
        assert!(xhr.get_response_header("content-type").is_none());
        assert_eq!(xhr.get_all_response_headers(), "");
    }
}
