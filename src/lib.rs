// src/lib.rs
//! Request Interceptor Library
//!
//! Intercepts outgoing HTTP requests issued through several independent
//! client transports, converts each into one canonical request, lets
//! registered listeners mock it, and otherwise performs the real call and
//! hands its response back untouched.
//!
//! # Architecture
//!
//! - **interception**: canonical model, URL resolver, listener registry,
//!   pooled patch state and the `Interceptor` lifecycle
//! - **transport**: the native clients (client request, XHR, fetch) and the
//!   real network behind them
//! - **adapters**: per-transport glue between a native call and the emitter
//! - **remote**: child/parent bridge forwarding requests across processes
//! - **observability**: tracing setup
//! - **utils**: errors and configuration
//!
//! # Example
//!
//! ```no_run
//! use request_interceptor::{fetch, FetchRequest, InterceptedResponse, Interceptor};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let interceptor = Interceptor::all();
//! interceptor.on_request_sync(|request| {
//!     if request.url().path() == "/user" {
//!         let _ = request.respond_with(InterceptedResponse::new(200).with_body("ok"));
//!     }
//! });
//! interceptor.apply();
//!
//! let response = fetch(FetchRequest::get("http://localhost/user")?).await?;
//! assert_eq!(response.text(), "ok");
//!
//! interceptor.dispose();
//! # Ok(())
//! # }
//! ```

pub(crate) mod adapters;
pub mod interception;
pub mod observability;
pub mod remote;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use interception::{
    resolve_url, AdapterKind, Agent, Credentials, Headers, InterceptedRequest,
    InterceptedResponse, Interceptor, ListenerId, PatchStats, Pool, RequestOptions, RequestState,
    ResponseEvent, ResponseSource,
};
pub use remote::{RemoteInterceptor, RemoteResolver};
pub use transport::{
    fetch, request, ClientRequest, Fetch, FetchRequest, FetchResponse, HttpClient,
    IncomingMessage, Network, ReadyState, XhrEvent, XmlHttpRequest,
};
pub use utils::config::InterceptorConfig;
pub use utils::errors::{InterceptorError, Result, TransportError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
