// src/interception/interceptor.rs
//! Interceptor lifecycle
//!
//! An `Interceptor` is one subscription to interception for a set of
//! adapters. `apply()` joins the pool (installing adapters on first use) and
//! `dispose()` leaves it (restoring the native path after the last consumer).
//! Both are idempotent. Dropping an applied interceptor disposes it.

use crate::interception::listeners::{ListenerId, ListenerRegistry, ResponseEvent};
use crate::interception::pool::{AdapterKind, InterceptorId, Pool};
use crate::interception::request::InterceptedRequest;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

static NEXT_INTERCEPTOR_ID: AtomicU64 = AtomicU64::new(1);

pub struct Interceptor {
    id: InterceptorId,
    adapters: Vec<AdapterKind>,
    registry: Arc<ListenerRegistry>,
    pool: Arc<Pool>,
    active: AtomicBool,
}

impl Interceptor {
    /// Create an interceptor for the given adapters on the global pool
    pub fn new(adapters: impl IntoIterator<Item = AdapterKind>) -> Self {
        Self::with_pool(adapters, Pool::global())
    }

    /// Create an interceptor bound to a specific pool
    pub fn with_pool(adapters: impl IntoIterator<Item = AdapterKind>, pool: Arc<Pool>) -> Self {
        let mut adapters: Vec<AdapterKind> = adapters.into_iter().collect();
        adapters.sort();
        adapters.dedup();

        Self {
            id: InterceptorId(NEXT_INTERCEPTOR_ID.fetch_add(1, Ordering::Relaxed)),
            adapters,
            registry: Arc::new(ListenerRegistry::new()),
            pool,
            active: AtomicBool::new(false),
        }
    }

    pub fn client_request() -> Self {
        Self::new([AdapterKind::ClientRequest])
    }

    pub fn xml_http_request() -> Self {
        Self::new([AdapterKind::XmlHttpRequest])
    }

    pub fn fetch() -> Self {
        Self::new([AdapterKind::Fetch])
    }

    /// Intercept every supported transport
    pub fn all() -> Self {
        Self::new(AdapterKind::ALL)
    }

    pub fn id(&self) -> InterceptorId {
        self.id
    }

    pub fn adapters(&self) -> &[AdapterKind] {
        &self.adapters
    }

    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start intercepting
    pub fn apply(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            debug!("Interceptor {:?} already applied", self.id);
            return;
        }

        for kind in &self.adapters {
            self.pool.join(*kind, self.id, Arc::clone(&self.registry));
        }
        debug!("Interceptor {:?} applied to {:?}", self.id, self.adapters);
    }

    /// Stop receiving future requests; in-flight requests still settle
    pub fn dispose(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }

        for kind in &self.adapters {
            self.pool.leave(*kind, self.id);
        }
        debug!("Interceptor {:?} disposed", self.id);
    }

    pub fn on_request<F, Fut>(&self, listener: F) -> ListenerId
    where
        F: Fn(InterceptedRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.registry.on_request(listener)
    }

    pub fn on_request_sync<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&InterceptedRequest) + Send + Sync + 'static,
    {
        self.registry.on_request_sync(listener)
    }

    pub fn on_response<F, Fut>(&self, listener: F) -> ListenerId
    where
        F: Fn(ResponseEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.registry.on_response(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.registry.remove(id)
    }

    pub fn remove_all_listeners(&self) {
        self.registry.clear();
    }
}

impl Drop for Interceptor {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("id", &self.id)
            .field("adapters", &self.adapters)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_is_idempotent() {
        let pool = Pool::new();
        let interceptor = Interceptor::with_pool([AdapterKind::Fetch], Arc::clone(&pool));

        interceptor.apply();
        interceptor.apply();
        assert!(interceptor.is_active());

        let stats = pool.stats(AdapterKind::Fetch);
        assert_eq!(stats.installs, 1);
        assert_eq!(stats.registrants, 1);

        interceptor.dispose();
        interceptor.dispose();
        assert!(!interceptor.is_active());
        assert_eq!(pool.stats(AdapterKind::Fetch).restores, 1);
    }

    #[test]
    fn test_n_interceptors_share_one_patch() {
        let pool = Pool::new();
        let interceptors: Vec<_> = (0..5)
            .map(|_| Interceptor::with_pool([AdapterKind::ClientRequest], Arc::clone(&pool)))
            .collect();

        for interceptor in &interceptors {
            interceptor.apply();
        }
        let stats = pool.stats(AdapterKind::ClientRequest);
        assert_eq!(stats.installs, 1);
        assert_eq!(stats.registrants, 5);

        for (index, interceptor) in interceptors.iter().enumerate() {
            interceptor.dispose();
            let stats = pool.stats(AdapterKind::ClientRequest);
            if index < 4 {
                assert!(stats.installed);
                assert_eq!(stats.restores, 0);
            }
        }

        let stats = pool.stats(AdapterKind::ClientRequest);
        assert!(!stats.installed);
        assert_eq!(stats.installs, 1);
        assert_eq!(stats.restores, 1);
    }

    #[test]
    fn test_reapply_after_dispose() {
        let pool = Pool::new();
        let interceptor = Interceptor::with_pool([AdapterKind::Fetch], Arc::clone(&pool));

        interceptor.apply();
        interceptor.dispose();
        interceptor.apply();

        let stats = pool.stats(AdapterKind::Fetch);
        assert!(stats.installed);
        assert_eq!(stats.installs, 2);
        assert_eq!(stats.restores, 1);
    }

    #[test]
    fn test_drop_disposes() {
        let pool = Pool::new();
        {
            let interceptor = Interceptor::with_pool(AdapterKind::ALL, Arc::clone(&pool));
            interceptor.apply();
            assert!(pool.is_installed(AdapterKind::XmlHttpRequest));
        }
        for kind in AdapterKind::ALL {
            assert!(!pool.is_installed(kind));
        }
    }

    #[test]
    fn test_adapters_are_deduplicated() {
        let interceptor = Interceptor::with_pool(
            [AdapterKind::Fetch, AdapterKind::ClientRequest, AdapterKind::Fetch],
            Pool::new(),
        );
        assert_eq!(
            interceptor.adapters(),
            &[AdapterKind::ClientRequest, AdapterKind::Fetch]
        );
    }

    #[test]
    fn test_remove_listeners() {
        let interceptor = Interceptor::with_pool([AdapterKind::Fetch], Pool::new());
        let id = interceptor.on_request_sync(|_| {});
        interceptor.on_response(|_| async {});

        assert!(interceptor.remove_listener(id));
        interceptor.remove_all_listeners();
        assert!(!interceptor.remove_listener(id));
    }
}
