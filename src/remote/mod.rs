// src/remote/mod.rs
//! Remote Bridge
//!
//! Lets a parent process observe and mock requests issued inside a child.
//!
//! ```text
//!  child process                                    parent process
//! ┌──────────────────────────┐  request (JSON line) ┌────────────────────────┐
//! │ RemoteInterceptor        │ ───────────────────▶ │ RemoteResolver         │
//! │  listener parks on reply │                      │  runs local listeners  │
//! │  PendingTable[id]        │ ◀─────────────────── │  response | unhandled  │
//! └──────────────────────────┘    reply by id       └────────────────────────┘
//! ```
//!
//! A `response` reply mocks the request in the child. `unhandled`, or a
//! closed channel, lets it fall through to the real network.

pub mod child;
pub mod message;
pub mod parent;

pub use child::RemoteInterceptor;
pub use message::{BridgeMessage, SerializedRequest, SerializedResponse};
pub use parent::RemoteResolver;
