// src/remote/child.rs
//! Child side of the bridge
//!
//! The child runs a regular [`Interceptor`] whose only listener forwards the
//! request to the parent and parks on a correlated reply. Other requests keep
//! flowing while one waits; replies may come back in any order.

use crate::interception::interceptor::Interceptor;
use crate::interception::pool::{AdapterKind, Pool};
use crate::interception::request::InterceptedRequest;
use crate::interception::response::InterceptedResponse;
use crate::remote::message::{next_line, BridgeMessage, SerializedRequest};
use crate::utils::config::{BridgeConfig, InterceptorConfig};
use crate::utils::errors::Result;
use dashmap::DashMap;
use futures::SinkExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, warn};
use uuid::Uuid;

/// What the parent decided for one request
#[derive(Debug)]
pub(crate) enum BridgeReply {
    Response(InterceptedResponse),
    Unhandled,
}

/// Requests waiting on the parent, keyed by correlation id
///
/// Entries are removed on reply. Once the channel closes every entry is
/// dropped, which wakes its waiter as cancelled.
#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    entries: DashMap<Uuid, oneshot::Sender<BridgeReply>>,
    closed: AtomicBool,
}

impl PendingTable {
    /// `None` once the channel is closed
    pub(crate) fn register(&self, id: Uuid) -> Option<oneshot::Receiver<BridgeReply>> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }

        let (tx, rx) = oneshot::channel();
        self.entries.insert(id, tx);

        // cancel_all may have run between the check and the insert
        if self.closed.load(Ordering::SeqCst) {
            self.entries.remove(&id);
            return None;
        }
        Some(rx)
    }

    /// Hand a reply to its waiter; `false` for an unknown id
    pub(crate) fn complete(&self, id: Uuid, reply: BridgeReply) -> bool {
        match self.entries.remove(&id) {
            Some((_, tx)) => {
                let _ = tx.send(reply);
                true
            }
            None => false,
        }
    }

    pub(crate) fn forget(&self, id: Uuid) {
        self.entries.remove(&id);
    }

    pub(crate) fn cancel_all(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let cancelled = self.entries.len();
        self.entries.clear();
        if cancelled > 0 {
            debug!("Cancelled {} pending bridge request(s)", cancelled);
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Interceptor that defers every decision to a parent process
pub struct RemoteInterceptor {
    interceptor: Interceptor,
    pending: Arc<PendingTable>,
    tasks: Vec<JoinHandle<()>>,
}

impl RemoteInterceptor {
    /// Bridge over an arbitrary reader/writer pair, intercepting every transport
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::with_interceptor(
            Interceptor::all(),
            reader,
            writer,
            &BridgeConfig::default(),
        )
    }

    /// Bridge over stdin/stdout, the usual setup for a spawned child
    pub fn stdio() -> Result<Self> {
        let config = InterceptorConfig::load()?;
        Ok(Self::with_interceptor(
            Interceptor::all(),
            tokio::io::stdin(),
            tokio::io::stdout(),
            &config.bridge,
        ))
    }

    /// Bridge on a specific pool
    pub fn with_pool<R, W>(pool: Arc<Pool>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::with_interceptor(
            Interceptor::with_pool(AdapterKind::ALL, pool),
            reader,
            writer,
            &BridgeConfig::default(),
        )
    }

    pub fn with_interceptor<R, W>(
        interceptor: Interceptor,
        reader: R,
        writer: W,
        config: &BridgeConfig,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let pending = Arc::new(PendingTable::default());
        let (outbound, rx) = mpsc::unbounded_channel();
        let max_frame_length = config.max_frame_length;

        let tasks = vec![
            tokio::spawn(write_loop(
                writer,
                rx,
                Arc::clone(&pending),
                max_frame_length,
            )),
            tokio::spawn(read_loop(reader, Arc::clone(&pending), max_frame_length)),
        ];

        let table = Arc::clone(&pending);
        interceptor.on_request(move |request: InterceptedRequest| {
            let outbound = outbound.clone();
            let pending = Arc::clone(&table);
            async move { forward(request, outbound, pending, max_frame_length).await }
        });

        Self {
            interceptor,
            pending,
            tasks,
        }
    }

    pub fn apply(&self) {
        self.interceptor.apply();
    }

    pub fn dispose(&self) {
        self.interceptor.dispose();
    }

    /// The local interceptor, for extra `response` listeners and such
    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    /// Requests still waiting for the parent
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Whether the parent channel has closed
    pub fn is_closed(&self) -> bool {
        self.pending.is_closed()
    }
}

impl Drop for RemoteInterceptor {
    fn drop(&mut self) {
        self.interceptor.dispose();
        for task in &self.tasks {
            task.abort();
        }
        self.pending.cancel_all();
    }
}

impl std::fmt::Debug for RemoteInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteInterceptor")
            .field("interceptor", &self.interceptor)
            .field("pending", &self.pending.len())
            .finish()
    }
}

async fn forward(
    request: InterceptedRequest,
    outbound: mpsc::UnboundedSender<String>,
    pending: Arc<PendingTable>,
    max_frame_length: usize,
) {
    let id = request.id();
    let message = BridgeMessage::Request {
        id,
        request: SerializedRequest::from(&request),
    };
    let line = match message.encode_within(max_frame_length) {
        Ok(line) => line,
        Err(e) => {
            warn!("Request {} bypasses the bridge: {}", id, e);
            return;
        }
    };

    let Some(reply) = pending.register(id) else {
        debug!("Bridge closed, request {} passes through", id);
        return;
    };

    if outbound.send(line).is_err() {
        pending.forget(id);
        debug!("Bridge writer gone, request {} passes through", id);
        return;
    }

    match reply.await {
        Ok(BridgeReply::Response(response)) => {
            if let Err(e) = request.respond_with(response) {
                warn!("Cannot apply bridged response: {}", e);
            }
        }
        Ok(BridgeReply::Unhandled) => debug!("Parent left request {} unhandled", id),
        Err(_) => debug!("Request {} cancelled by bridge shutdown", id),
    }
}

async fn write_loop<W>(
    writer: W,
    mut rx: mpsc::UnboundedReceiver<String>,
    pending: Arc<PendingTable>,
    max_frame_length: usize,
) where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut sink = FramedWrite::new(writer, LinesCodec::new_with_max_length(max_frame_length));

    while let Some(line) = rx.recv().await {
        if let Err(e) = sink.send(line).await {
            warn!("Bridge write failed: {}", e);
            break;
        }
    }
    pending.cancel_all();
}

async fn read_loop<R>(reader: R, pending: Arc<PendingTable>, max_frame_length: usize)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(max_frame_length));

    while let Some(line) = next_line(&mut lines).await {
        if line.trim().is_empty() {
            continue;
        }

        let (id, reply) = match BridgeMessage::decode(&line) {
            Ok(BridgeMessage::Response { id, response }) => {
                (id, BridgeReply::Response(response.into()))
            }
            Ok(BridgeMessage::Unhandled { id }) => (id, BridgeReply::Unhandled),
            Ok(BridgeMessage::Request { id, .. }) => {
                warn!("Ignoring request message {} sent to the child", id);
                continue;
            }
            Err(e) => {
                warn!("Ignoring malformed bridge message: {}", e);
                continue;
            }
        };

        if !pending.complete(id, reply) {
            warn!("Dropping reply for unknown request {}", id);
        }
    }

    debug!("Bridge reader reached end of stream");
    pending.cancel_all();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pending_table_lifecycle() {
        let table = PendingTable::default();
        let id = Uuid::new_v4();

        let rx = table.register(id).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.complete(id, BridgeReply::Unhandled));
        assert!(matches!(rx.await, Ok(BridgeReply::Unhandled)));
        assert_eq!(table.len(), 0);

        assert!(!table.complete(id, BridgeReply::Unhandled));
    }

    #[tokio::test]
    async fn test_cancel_all_wakes_waiters() {
        let table = PendingTable::default();
        let rx = table.register(Uuid::new_v4()).unwrap();

        table.cancel_all();
        assert!(rx.await.is_err());
        assert!(table.is_closed());
        assert!(table.register(Uuid::new_v4()).is_none());
    }
}
