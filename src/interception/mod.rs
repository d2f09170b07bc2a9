// src/interception/mod.rs
//! Request interception core
//!
//! - **URL Resolver**: rebuilds a fully-qualified URL from loose request options
//! - **Canonical model**: [`InterceptedRequest`], [`InterceptedResponse`], [`Headers`]
//! - **Listener registry**: ordered `request` / `response` observers
//! - **Emitter**: the single emission point adapters call into
//! - **Pool**: process-wide, reference-counted patch state per adapter
//! - **Interceptor**: the `apply()` / `dispose()` lifecycle consumers hold
//!
//! # Architecture
//!
//! ```text
//! Application code (unmodified)
//!     │
//!     ├─ ClientRequest::end() ─┐
//!     ├─ XmlHttpRequest::send()├─▶ Pool::emitter(kind)?
//!     └─ Fetch::fetch() ───────┘        │
//!                         None ◀────────┴────────▶ Some(emitter)
//!                          │                          │
//!                    native path            request listeners
//!                                              │            │
//!                                        respond_with   nothing
//!                                              │            │
//!                                        mocked response  native path
//! ```

pub mod emitter;
pub mod headers;
pub mod interceptor;
pub mod listeners;
pub mod pool;
pub mod request;
pub mod response;
pub mod url_resolver;

// Re-export commonly used types
pub use emitter::Emitter;
pub use headers::Headers;
pub use interceptor::Interceptor;
pub use listeners::{ListenerId, ListenerRegistry, ResponseEvent};
pub use pool::{AdapterKind, InterceptorId, PatchStats, Pool};
pub use request::{Credentials, InterceptedRequest, RequestBuilder, RequestState};
pub use response::{InterceptedResponse, ResponseSource};
pub use url_resolver::{resolve_url, Agent, RequestOptions};
