// src/interception/listeners.rs
//! Listener registry
//!
//! An ordered set of observers per event type. `request` listeners may finish
//! synchronously or return work that completes later; both are expressed as a
//! boxed future so the emitter can wait for all of them uniformly.

use crate::interception::request::InterceptedRequest;
use crate::interception::response::{InterceptedResponse, ResponseSource};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned when registering a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Payload of the `response` event
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    pub request: InterceptedRequest,
    pub response: InterceptedResponse,
    pub source: ResponseSource,
}

impl ResponseEvent {
    pub fn request_id(&self) -> uuid::Uuid {
        self.request.id()
    }
}

pub(crate) type RequestListener =
    Arc<dyn Fn(InterceptedRequest) -> BoxFuture<'static, ()> + Send + Sync>;
pub(crate) type ResponseListener =
    Arc<dyn Fn(ResponseEvent) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Default)]
pub struct ListenerRegistry {
    request: RwLock<Vec<(ListenerId, RequestListener)>>,
    response: RwLock<Vec<(ListenerId, ResponseListener)>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register an asynchronous `request` listener
    pub fn on_request<F, Fut>(&self, listener: F) -> ListenerId
    where
        F: Fn(InterceptedRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id();
        let listener: RequestListener = Arc::new(move |request: InterceptedRequest| listener(request).boxed());
        self.request.write().push((id, listener));
        id
    }

    /// Register a `request` listener that finishes before returning
    pub fn on_request_sync<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&InterceptedRequest) + Send + Sync + 'static,
    {
        self.on_request(move |request: InterceptedRequest| {
            listener(&request);
            futures::future::ready(())
        })
    }

    pub fn on_response<F, Fut>(&self, listener: F) -> ListenerId
    where
        F: Fn(ResponseEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id();
        let listener: ResponseListener = Arc::new(move |event: ResponseEvent| listener(event).boxed());
        self.response.write().push((id, listener));
        id
    }

    /// Remove one listener; returns whether it was registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut removed = false;
        self.request.write().retain(|(existing, _)| {
            let keep = *existing != id;
            removed |= !keep;
            keep
        });
        self.response.write().retain(|(existing, _)| {
            let keep = *existing != id;
            removed |= !keep;
            keep
        });
        removed
    }

    pub fn clear(&self) {
        self.request.write().clear();
        self.response.write().clear();
    }

    pub fn request_listener_count(&self) -> usize {
        self.request.read().len()
    }

    pub fn response_listener_count(&self) -> usize {
        self.response.read().len()
    }

    pub(crate) fn request_listeners(&self) -> Vec<RequestListener> {
        self.request
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    pub(crate) fn response_listeners(&self) -> Vec<ResponseListener> {
        self.response
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("request", &self.request_listener_count())
            .field("response", &self.response_listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_remove() {
        let registry = ListenerRegistry::new();
        let first = registry.on_request_sync(|_| {});
        let second = registry.on_response(|_| async {});

        assert_ne!(first, second);
        assert_eq!(registry.request_listener_count(), 1);
        assert_eq!(registry.response_listener_count(), 1);

        assert!(registry.remove(first));
        assert!(!registry.remove(first));
        assert_eq!(registry.request_listener_count(), 0);

        registry.clear();
        assert_eq!(registry.response_listener_count(), 0);
    }
}
