// tests/child_process.rs
//! Bridge across a real process boundary using the `intercept-child` binary

mod common;

use common::TestServer;
use request_interceptor::{InterceptedResponse, RemoteResolver};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

async fn run_child(resolver: &RemoteResolver, url: &str) -> String {
    let mut child = Command::new(env!("CARGO_BIN_EXE_intercept-child"))
        .arg(url)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .unwrap();

    resolver.attach_child(&mut child).unwrap();

    let output = tokio::time::timeout(Duration::from_secs(30), child.wait_with_output())
        .await
        .expect("child timed out")
        .unwrap();
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .find(|line| line.starts_with("done:") || line.starts_with("error:"))
        .unwrap_or_else(|| panic!("no outcome in child stderr: {}", stderr))
        .to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unhandled_child_request_hits_network() {
    let server = TestServer::start().await;
    let resolver = RemoteResolver::new();
    resolver.on_request_sync(|request| {
        if request.url().path() == "/elsewhere" {
            let _ = request.respond_with(InterceptedResponse::new(500));
        }
    });

    let outcome = run_child(&resolver, &server.url("/user")).await;
    assert_eq!(outcome, "done:200:user-body");
    assert_eq!(server.hits(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parent_mocks_child_process() {
    let server = TestServer::start().await;
    let resolver = RemoteResolver::new();
    resolver.on_request_sync(|request| {
        if request.url().path() == "/user" {
            let _ = request.respond_with(InterceptedResponse::new(201).with_body("mocked"));
        }
    });

    let outcome = run_child(&resolver, &server.url("/user")).await;
    assert_eq!(outcome, "done:201:mocked");
    assert_eq!(server.hits(), 0);
}
