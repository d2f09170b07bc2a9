// src/interception/pool.rs
//! Process-wide adapter pool
//!
//! The pool is the only owner of patch state. For each adapter kind it keeps
//! the interceptors that joined, in join order. The first registrant installs
//! the adapter; the last one to leave restores the native path. Native entry
//! points ask the pool for an [`Emitter`] and fall back to their original
//! implementation when there is none.
//!
//! ```text
//! Interceptor A ─┐                     ┌─ install (once)
//! Interceptor B ─┼─ join ─▶ PoolEntry ─┤
//! Interceptor C ─┘                     └─ restore (after last leave)
//! ```

use crate::interception::emitter::Emitter;
use crate::interception::listeners::ListenerRegistry;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

static GLOBAL_POOL: Lazy<Arc<Pool>> = Lazy::new(|| Arc::new(Pool::default()));

/// Native transports that can be intercepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdapterKind {
    /// Socket-level client request
    ClientRequest,
    /// Browser-style XMLHttpRequest
    XmlHttpRequest,
    /// Global fetch
    Fetch,
}

impl AdapterKind {
    pub const ALL: [AdapterKind; 3] = [
        AdapterKind::ClientRequest,
        AdapterKind::XmlHttpRequest,
        AdapterKind::Fetch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::ClientRequest => "client-request",
            AdapterKind::XmlHttpRequest => "xhr",
            AdapterKind::Fetch => "fetch",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an interceptor inside the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(pub(crate) u64);

/// Patch bookkeeping for one adapter kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    /// Whether the adapter is currently installed
    pub installed: bool,

    /// Number of interceptors currently joined
    pub registrants: usize,

    /// Times the adapter has been installed
    pub installs: u64,

    /// Times the native path has been restored
    pub restores: u64,
}

#[derive(Default)]
struct PoolEntry {
    registrants: Vec<(InterceptorId, Arc<ListenerRegistry>)>,
    installs: u64,
    restores: u64,
}

#[derive(Default)]
pub struct Pool {
    entries: Mutex<HashMap<AdapterKind, PoolEntry>>,
}

impl Pool {
    /// Create an isolated pool
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The pool shared by every default-constructed transport and interceptor
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_POOL)
    }

    /// Register an interceptor for an adapter; returns true if this installed it
    pub(crate) fn join(
        &self,
        kind: AdapterKind,
        id: InterceptorId,
        registry: Arc<ListenerRegistry>,
    ) -> bool {
        let mut entries = self.entries.lock();
        let entry = entries.entry(kind).or_default();

        if entry.registrants.iter().any(|(existing, _)| *existing == id) {
            return false;
        }

        let install = entry.registrants.is_empty();
        entry.registrants.push((id, registry));

        if install {
            entry.installs += 1;
            metrics::counter!("interceptor_patch_installs_total", "adapter" => kind.as_str())
                .increment(1);
            info!("Installed {} adapter", kind);
        } else {
            debug!(
                "Interceptor {:?} joined {} adapter ({} registrants)",
                id,
                kind,
                entry.registrants.len()
            );
        }

        install
    }

    /// Remove an interceptor; returns true if this restored the native path
    pub(crate) fn leave(&self, kind: AdapterKind, id: InterceptorId) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&kind) else {
            return false;
        };

        let before = entry.registrants.len();
        entry.registrants.retain(|(existing, _)| *existing != id);
        if entry.registrants.len() == before {
            return false;
        }

        if entry.registrants.is_empty() {
            entry.restores += 1;
            metrics::counter!("interceptor_patch_restores_total", "adapter" => kind.as_str())
                .increment(1);
            info!("Restored native {} transport", kind);
            true
        } else {
            debug!(
                "Interceptor {:?} left {} adapter ({} registrants remain)",
                id,
                kind,
                entry.registrants.len()
            );
            false
        }
    }

    /// Emission point for an installed adapter, or `None` when the native
    /// path is active
    pub fn emitter(&self, kind: AdapterKind) -> Option<Emitter> {
        let entries = self.entries.lock();
        let entry = entries.get(&kind)?;
        if entry.registrants.is_empty() {
            return None;
        }

        let registries = entry
            .registrants
            .iter()
            .map(|(_, registry)| Arc::clone(registry))
            .collect();
        Some(Emitter::new(kind, registries))
    }

    pub fn is_installed(&self, kind: AdapterKind) -> bool {
        self.entries
            .lock()
            .get(&kind)
            .map(|entry| !entry.registrants.is_empty())
            .unwrap_or(false)
    }

    pub fn stats(&self, kind: AdapterKind) -> PatchStats {
        self.entries
            .lock()
            .get(&kind)
            .map(|entry| PatchStats {
                installed: !entry.registrants.is_empty(),
                registrants: entry.registrants.len(),
                installs: entry.installs,
                restores: entry.restores,
            })
            .unwrap_or_default()
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        let mut map = f.debug_map();
        for (kind, entry) in entries.iter() {
            map.entry(kind, &entry.registrants.len());
        }
        map.finish()
    }
}
