// src/transport/mod.rs
//! Native HTTP transports
//!
//! Each transport owns a single request-initiation entry point that asks the
//! [`Pool`](crate::interception::Pool) for an emitter. With no emitter the
//! transport behaves exactly like a plain client.

pub mod client_request;
pub mod fetch;
pub mod network;
pub mod xhr;

pub use client_request::{request, ClientRequest, HttpClient, IncomingMessage};
pub use fetch::{fetch, Fetch, FetchRequest, FetchResponse};
pub use network::{default_network, HyperNetwork, Network, NetworkRequest, NetworkResponse};
pub use xhr::{ReadyState, XhrEvent, XmlHttpRequest};
