// crates/llm-probe-core/tests/support/mod.rs
// ============================================================================
// Module: Mock Proxy Support
// Description: In-process HTTP stand-in for the LLM-routing proxy.
// Purpose: Exercise the runner and suite against scripted proxy behavior.
// Dependencies: axum, tokio, llm-probe-core
// ============================================================================

//! ## Overview
//! Spawns an axum server on `127.0.0.1:0` that answers every request through a
//! scripted responder and records what it received. Runners reach it through
//! `resolve_to`, so provider subdomains resolve to loopback while the `Host`
//! header still carries the subdomain.

#![allow(
    dead_code,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Shared helpers are reused across test binaries and fail fast on setup errors."
)]

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use llm_probe_core::RunEvent;
use llm_probe_core::RunEventSink;
use llm_probe_core::RunnerSettings;
use llm_probe_core::Scheme;
use serde_json::Value;
use serde_json::json;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

/// Domain the mock answers for; the port is appended per instance.
pub const MOCK_DOMAIN: &str = "llm-proxy.test";

/// Scripted reply for one request.
#[derive(Clone, Debug)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl MockReply {
    /// JSON reply with no delay.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Raw text reply with no delay.
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Delays the reply.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Request as observed by the mock.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub host: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl RecordedRequest {
    /// Returns the subdomain portion of the `Host` header.
    pub fn subdomain(&self) -> &str {
        self.host.split('.').next().unwrap_or_default()
    }

    /// Returns true when any message in the body mentions `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.body.to_string().contains(needle)
    }
}

/// Responder invoked for each request.
type Responder = Arc<dyn Fn(&RecordedRequest) -> MockReply + Send + Sync>;

#[derive(Clone)]
struct MockState {
    responder: Responder,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Handle for the mock proxy server.
pub struct MockProxy {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockProxy {
    /// Spawns a mock proxy driven by `responder`.
    pub fn spawn<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockReply + Send + Sync + 'static,
    {
        let listener = StdTcpListener::bind("127.0.0.1:0").expect("mock proxy bind");
        listener.set_nonblocking(true).expect("mock proxy nonblocking");
        let addr = listener.local_addr().expect("mock proxy local addr");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            responder: Arc::new(responder),
            requests: Arc::clone(&requests),
        };
        let app = Router::new().fallback(handle).with_state(state);
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
            shutdown: Some(shutdown_tx),
            join: Some(join),
            requests,
        }
    }

    /// Spawns a proxy that blocks harmful prompts and answers everything else.
    pub fn well_behaved() -> Self {
        Self::spawn(well_behaved_reply)
    }

    /// Returns `llm-proxy.test:{port}`.
    pub fn base_domain(&self) -> String {
        format!("{MOCK_DOMAIN}:{}", self.addr.port())
    }

    /// Runner settings that route every provider host to this mock.
    pub fn runner_settings(&self, timeout: Duration) -> RunnerSettings {
        RunnerSettings {
            base_domain: self.base_domain(),
            scheme: Scheme::Http,
            timeout,
            resolve_to: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        }
    }

    /// Returns the requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
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

/// Blocks prompts mentioning a bomb with a content-policy error; otherwise
/// answers with a provider-shaped success body.
pub fn well_behaved_reply(request: &RecordedRequest) -> MockReply {
    if request.mentions("bomb") {
        return MockReply::json(400, &json!({"error": {"type": "content_policy"}}));
    }
    match request.subdomain() {
        "google" => MockReply::json(200, &json!({"candidates": [{"content": {"parts": []}}]})),
        "anthropic" => MockReply::json(200, &json!({"content": [{"type": "text", "text": "hi"}]})),
        _ => MockReply::json(200, &json!({"choices": [{"message": {"content": "hi"}}]})),
    }
}

async fn handle(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = RecordedRequest {
        host: headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect(),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    let reply = (state.responder)(&request);
    if let Ok(mut entries) = state.requests.lock() {
        entries.push(request);
    }
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], reply.body).into_response()
}

/// Sink that keeps events in memory.
#[derive(Default)]
pub struct CapturingSink {
    events: Mutex<Vec<RunEvent>>,
}

impl CapturingSink {
    /// Returns the recorded events.
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
    }
}

impl RunEventSink for CapturingSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(mut entries) = self.events.lock() {
            entries.push(event.clone());
        }
    }
}

/// Returns a loopback port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind probe port");
    listener.local_addr().expect("probe port addr").port()
}
