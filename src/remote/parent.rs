// src/remote/parent.rs
//! Parent side of the bridge
//!
//! Reads requests from one or more children, runs each through the local
//! listener registry exactly like a locally intercepted request, and writes
//! back either the mock or an `unhandled` marker. Requests are resolved
//! concurrently, so a slow listener for one request never holds up another.

use crate::interception::emitter::Emitter;
use crate::interception::listeners::{ListenerId, ListenerRegistry};
use crate::interception::request::InterceptedRequest;
use crate::remote::message::{next_line, BridgeMessage, SerializedRequest, SerializedResponse};
use crate::utils::config::BridgeConfig;
use crate::utils::errors::{InterceptorError, Result};
use futures::SinkExt;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct RemoteResolver {
    registry: Arc<ListenerRegistry>,
    config: BridgeConfig,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RemoteResolver {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        Self {
            registry: Arc::new(ListenerRegistry::new()),
            config,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Listen for requests coming from any attached child
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

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.registry.remove(id)
    }

    /// Serve a child over an arbitrary reader/writer pair
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach<R, W>(&self, reader: R, writer: W)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, rx) = mpsc::unbounded_channel();
        let max_frame_length = self.config.max_frame_length;

        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(tokio::spawn(write_loop(writer, rx, max_frame_length)));
        tasks.push(tokio::spawn(read_loop(
            reader,
            outbound,
            Arc::clone(&self.registry),
            max_frame_length,
        )));
    }

    /// Serve a child spawned with piped stdin and stdout
    pub fn attach_child(&self, child: &mut Child) -> Result<()> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| InterceptorError::Bridge("child stdout is not piped".to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| InterceptorError::Bridge("child stdin is not piped".to_string()))?;

        info!("Attached bridge to child process {:?}", child.id());
        self.attach(stdout, stdin);
        Ok(())
    }

    /// Stop serving every attached child
    pub fn dispose(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Default for RemoteResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RemoteResolver {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for RemoteResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteResolver")
            .field("registry", &self.registry)
            .field("tasks", &self.tasks.lock().len())
            .finish()
    }
}

async fn resolve(
    id: Uuid,
    request: SerializedRequest,
    registry: Arc<ListenerRegistry>,
) -> BridgeMessage {
    let request = match request.to_request() {
        Ok(request) => request,
        Err(e) => {
            warn!("Cannot rebuild bridged request {}: {}", id, e);
            return BridgeMessage::Unhandled { id };
        }
    };

    let emitter = Emitter::detached("remote", registry);
    match emitter.resolve(&request).await {
        Some(response) => BridgeMessage::Response {
            id,
            response: SerializedResponse::from(&response),
        },
        None => BridgeMessage::Unhandled { id },
    }
}

async fn read_loop<R>(
    reader: R,
    outbound: mpsc::UnboundedSender<BridgeMessage>,
    registry: Arc<ListenerRegistry>,
    max_frame_length: usize,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(max_frame_length));

    while let Some(line) = next_line(&mut lines).await {
        if line.trim().is_empty() {
            continue;
        }

        match BridgeMessage::decode(&line) {
            Ok(BridgeMessage::Request { id, request }) => {
                let outbound = outbound.clone();
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let reply = resolve(id, request, registry).await;
                    if outbound.send(reply).is_err() {
                        debug!("Child channel closed before reply to {}", id);
                    }
                });
            }
            Ok(other) => warn!("Ignoring unexpected bridge message {:?}", other.id()),
            Err(e) => warn!("Ignoring malformed bridge message: {}", e),
        }
    }

    debug!("Child closed the bridge");
}

async fn write_loop<W>(
    writer: W,
    mut rx: mpsc::UnboundedReceiver<BridgeMessage>,
    max_frame_length: usize,
) where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut sink = FramedWrite::new(writer, LinesCodec::new_with_max_length(max_frame_length));

    while let Some(message) = rx.recv().await {
        let id = message.id();
        let line = match message.encode_within(max_frame_length) {
            Ok(line) => line,
            Err(e) => {
                // The child would discard this reply and wait forever
                warn!("Reply {} cannot be bridged, leaving it unhandled: {}", id, e);
                match (BridgeMessage::Unhandled { id }).encode() {
                    Ok(line) => line,
                    Err(_) => continue,
                }
            }
        };
        if let Err(e) = sink.send(line).await {
            warn!("Bridge write failed: {}", e);
            break;
        }
    }
}
