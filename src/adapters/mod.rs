// src/adapters/mod.rs
//! Transport adapters
//!
//! One adapter per native transport. Each receives the captured native call
//! and the [`Emitter`](crate::interception::Emitter) handed out by the pool,
//! then follows the same cycle:
//!
//! 1. Build an [`InterceptedRequest`](crate::interception::InterceptedRequest)
//! 2. `emitter.resolve()`: every `request` listener runs to completion
//! 3. Mocked: build the native response from the mock.
//!    Otherwise: run the native path and return its result unchanged.
//! 4. Emit the `response` event

pub(crate) mod client_request;
pub(crate) mod fetch;
pub(crate) mod xhr;
