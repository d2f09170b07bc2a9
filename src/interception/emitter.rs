// src/interception/emitter.rs
//! The single emission point handed to adapters
//!
//! An `Emitter` is a snapshot of the listener registries that were active
//! when a request was emitted. Disposing an interceptor afterwards does not
//! affect requests that already hold an emitter.

use crate::interception::listeners::{ListenerRegistry, ResponseEvent};
use crate::interception::pool::AdapterKind;
use crate::interception::request::InterceptedRequest;
use crate::interception::response::{InterceptedResponse, ResponseSource};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Emitter {
    label: &'static str,
    registries: Vec<Arc<ListenerRegistry>>,
}

impl Emitter {
    pub(crate) fn new(kind: AdapterKind, registries: Vec<Arc<ListenerRegistry>>) -> Self {
        Self {
            label: kind.as_str(),
            registries,
        }
    }

    /// Emitter over a single registry that is not tied to a native transport
    pub(crate) fn detached(label: &'static str, registry: Arc<ListenerRegistry>) -> Self {
        Self {
            label,
            registries: vec![registry],
        }
    }

    /// Emit `request` and wait for every listener to finish
    ///
    /// Listeners are started in order (interceptors in join order, then each
    /// registry in registration order) and awaited together. Returns the
    /// mocked response if one of them called `respond_with`.
    pub async fn resolve(&self, request: &InterceptedRequest) -> Option<InterceptedResponse> {
        let listeners: Vec<_> = self
            .registries
            .iter()
            .flat_map(|registry| registry.request_listeners())
            .collect();

        debug!(
            "[{}] {} {} ({}) -> {} listener(s)",
            self.label,
            request.method(),
            request.url(),
            request.id(),
            listeners.len()
        );

        join_all(listeners.iter().map(|listener| listener(request.clone()))).await;

        let outcome = request.settle();
        match &outcome {
            Some(response) => debug!(
                "[{}] request {} mocked with status {}",
                self.label,
                request.id(),
                response.status
            ),
            None => debug!("[{}] request {} passes through", self.label, request.id()),
        }
        outcome
    }

    /// Emit `response` after the request settled
    ///
    /// Listeners run on a spawned task so the application receives its
    /// response without waiting on observers.
    pub fn emit_response(
        &self,
        request: &InterceptedRequest,
        response: InterceptedResponse,
        source: ResponseSource,
    ) {
        let listeners: Vec<_> = self
            .registries
            .iter()
            .flat_map(|registry| registry.response_listeners())
            .collect();

        if listeners.is_empty() {
            return;
        }

        let event = ResponseEvent {
            request: request.clone(),
            response,
            source,
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    join_all(listeners.iter().map(|listener| listener(event.clone()))).await;
                });
            }
            Err(_) => warn!(
                "[{}] no async runtime, dropping response event for {}",
                self.label,
                request.id()
            ),
        }
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("label", &self.label)
            .field("registries", &self.registries.len())
            .finish()
    }
}
