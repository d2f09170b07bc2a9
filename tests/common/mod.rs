// tests/common/mod.rs
//! Local HTTP/1 server used as the real network endpoint

#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::ext::ReasonPhrase;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use request_interceptor::transport::{HyperNetwork, Network};
use request_interceptor::{Headers, Pool};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct TestServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Routes:
    /// - `GET /user`: `user-body` with `x-server: real`
    /// - `/echo`: the request body, with the method in `x-method`
    /// - `/slow`: `slow-body` after 100ms
    /// - `/auth`: the received `Authorization` header, or an empty body
    /// - `/reason`: 200 with the reason phrase `All Good`
    /// - anything else: 404
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let counter = Arc::clone(&counter);

                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        handle(req)
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self { addr, hits, task }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Requests that actually reached the server
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let authorization = req
        .headers()
        .get("authorization")
        .map(|value| Bytes::copy_from_slice(value.as_bytes()))
        .unwrap_or_default();
    let body = req
        .into_body()
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();

    let response = match path.as_str() {
        "/user" => Response::builder()
            .status(200)
            .header("x-server", "real")
            .header("content-type", "text/plain")
            .body(Full::new(Bytes::from_static(b"user-body"))),
        "/echo" => Response::builder()
            .status(200)
            .header("x-method", method)
            .body(Full::new(body)),
        "/auth" => Response::builder().status(200).body(Full::new(authorization)),
        "/reason" => Response::builder()
            .status(200)
            .extension(ReasonPhrase::from_static(b"All Good"))
            .body(Full::new(Bytes::from_static(b"reason"))),
        "/slow" => {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            Response::builder()
                .status(200)
                .body(Full::new(Bytes::from_static(b"slow-body")))
        }
        _ => Response::builder()
            .status(404)
            .body(Full::new(Bytes::from_static(b"not found"))),
    };

    Ok(response.unwrap())
}

/// Address nothing listens on
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn isolated() -> (Arc<Pool>, Arc<dyn Network>) {
    (Pool::new(), Arc::new(HyperNetwork::default()))
}

/// Headers minus the ones that legitimately change between two calls
pub fn stable_headers(headers: &Headers) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| *name != "date")
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}
