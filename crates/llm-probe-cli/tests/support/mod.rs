// crates/llm-probe-cli/tests/support/mod.rs
// ============================================================================
// Module: CLI Test Support
// Description: Mock proxy and binary invocation helpers for CLI tests.
// Purpose: Run the `llm-probe` binary against a local scripted proxy.
// Dependencies: axum, tokio
// ============================================================================

//! ## Overview
//! A minimal axum proxy on `127.0.0.1:0` plus a command builder that clears
//! inherited `LLM_PROBE_*` variables so tests see only what they set.

#![allow(
    dead_code,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Shared helpers are reused across test binaries and fail fast on setup errors."
)]

use std::net::SocketAddr;
use std::net::TcpListener as StdTcpListener;
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use axum::Router;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

/// Environment variables the binary reads.
pub const PROBE_ENV_VARS: [&str; 5] = [
    "LLM_PROBE_BASE_DOMAIN",
    "LLM_PROBE_API_KEY",
    "LLM_PROBE_TIMEOUT_SEC",
    "LLM_PROBE_DELAY_MS",
    "LLM_PROBE_FAIL_ON_ERROR",
];

/// How the mock answers harmful prompts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    /// Blocks harmful prompts with a content-policy error.
    Blocking,
    /// Answers every prompt with a completion.
    Leaky,
}

/// Handle for the mock proxy server.
pub struct MockProxy {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
}

impl MockProxy {
    /// Spawns a mock proxy with the given behavior.
    pub fn spawn(behavior: Behavior) -> Self {
        let listener = StdTcpListener::bind("127.0.0.1:0").expect("mock proxy bind");
        listener.set_nonblocking(true).expect("mock proxy nonblocking");
        let addr = listener.local_addr().expect("mock proxy local addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().fallback(move |body: Bytes| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                reply(behavior, &body)
            }
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = thread::spawn(move || {
            let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
                return;
            };
            runtime.block_on(async move {
                let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                    return;
                };
                let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                });
                let _ = server.await;
            });
        });
        Self {
            addr,
            hits,
            shutdown: Some(shutdown_tx),
            join: Some(join),
        }
    }

    /// Returns `llm-proxy.test:{port}`.
    pub fn base_domain(&self) -> String {
        format!("llm-proxy.test:{}", self.addr.port())
    }

    /// Flags that point the binary at this mock with no inter-case delay.
    pub fn target_args(&self) -> Vec<String> {
        vec![
            "--scheme".to_string(),
            "http".to_string(),
            "--base-domain".to_string(),
            self.base_domain(),
            "--resolve-to".to_string(),
            "127.0.0.1".to_string(),
            "--delay-ms".to_string(),
            "0".to_string(),
        ]
    }

    /// Number of requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockProxy {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn reply(behavior: Behavior, body: &[u8]) -> Response {
    let harmful = String::from_utf8_lossy(body).contains("bomb");
    let (status, payload) = if harmful && behavior == Behavior::Blocking {
        (StatusCode::BAD_REQUEST, r#"{"error":{"type":"content_policy"}}"#)
    } else {
        (StatusCode::OK, r#"{"choices":[{"message":{"content":"hi"}}]}"#)
    };
    (status, [(header::CONTENT_TYPE, "application/json")], payload).into_response()
}

/// Builds a command for the `llm-probe` binary with a clean probe environment.
pub fn probe_command() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_llm-probe"));
    for name in PROBE_ENV_VARS {
        command.env_remove(name);
    }
    command
}
