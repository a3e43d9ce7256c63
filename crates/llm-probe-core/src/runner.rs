// crates/llm-probe-core/src/runner.rs
// ============================================================================
// Module: HTTP Test Runner
// Description: Sends one probe request per test case and checks the result.
// Purpose: Turn proxy responses into pass/fail outcomes without propagating errors.
// Dependencies: reqwest, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! [`ProbeRunner`] owns one pooled HTTP client for the whole suite. Each call to
//! [`ProbeRunner::run_test_case`] issues a single POST bounded by the configured
//! timeout and evaluates the response:
//!
//! - the status must equal the case's expected status;
//! - for trigger cases with a marker, the body must parse as JSON and its
//!   serialized form must contain the marker.
//!
//! Every failure (status, marker, JSON, transport) is folded into a
//! [`CaseOutcome`]; nothing is retried and nothing escapes the case boundary.
//!
//! Security posture: response bodies are untrusted and read under a hard byte
//! limit. TLS certificate verification is always on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use std::time::Instant;

use reqwest::Client;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::case::CasePhase;
use crate::case::Provider;
use crate::case::TestCase;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Proxy domain used when none is configured.
pub const DEFAULT_BASE_DOMAIN: &str = "llm-proxy.com";
/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Number of response characters quoted in status-mismatch messages.
pub const RESPONSE_PREVIEW_CHARS: usize = 500;
/// Response body bytes kept for evaluation; anything beyond is discarded.
pub const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// URL scheme used to reach the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// TLS with certificate verification.
    #[default]
    Https,
    /// Plain HTTP, for local mock proxies only.
    Http,
}

impl Scheme {
    /// Returns the URL scheme string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }
}

/// Target and transport settings for the runner.
///
/// # Invariants
/// - `base_domain` holds a host with an optional port and no scheme or path.
/// - `timeout` is non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Proxy domain appended to each provider subdomain.
    pub base_domain: String,
    /// URL scheme.
    pub scheme: Scheme,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pins every provider host to this address instead of using DNS.
    pub resolve_to: Option<IpAddr>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            base_domain: DEFAULT_BASE_DOMAIN.to_string(),
            scheme: Scheme::Https,
            timeout: DEFAULT_TIMEOUT,
            resolve_to: None,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while constructing a runner.
///
/// # Invariants
/// - Only construction fails; per-case problems become [`CaseFailure`].
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The base domain cannot form a valid URL host.
    #[error("invalid base domain '{domain}': {reason}")]
    InvalidBaseDomain {
        /// Rejected domain.
        domain: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The HTTP client could not be built.
    #[error("http client build failed: {0}")]
    Client(String),
}

/// Why a single case failed.
///
/// # Invariants
/// - Display output is the message tail after `"{name} - "`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaseFailure {
    /// The proxy answered with a different status.
    #[error("Unexpected status: {status}\n   Expected: {expected}\n   Response: {preview}")]
    UnexpectedStatus {
        /// Observed status.
        status: u16,
        /// Expected status.
        expected: u16,
        /// First [`RESPONSE_PREVIEW_CHARS`] characters of the body.
        preview: String,
    },
    /// The violation marker is absent from the serialized response.
    ///
    /// The body is re-serialized as compact JSON before the substring search,
    /// so `{"type":"content_policy"}` matches while `'type'` or `: "` do not.
    #[error("Expected violation '{marker}' not found in response")]
    ViolationMissing {
        /// Marker that was looked for.
        marker: String,
    },
    /// A trigger response body was not JSON.
    #[error("Failed to parse JSON response")]
    InvalidJson,
    /// Network, TLS, timeout, or request-construction error.
    #[error("Error: {0}")]
    Transport(String),
}

impl CaseFailure {
    /// Returns a stable label for event logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnexpectedStatus {
                ..
            } => "unexpected_status",
            Self::ViolationMissing {
                ..
            } => "violation_missing",
            Self::InvalidJson => "invalid_json",
            Self::Transport(_) => "transport",
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of running one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    /// Case name.
    pub name: String,
    /// Phase the case ran in.
    pub phase: CasePhase,
    /// Request URL.
    pub url: String,
    /// HTTP status when a response arrived.
    pub status: Option<u16>,
    /// Failure reason; `None` on success.
    pub failure: Option<CaseFailure>,
    /// Wall time spent on the request.
    pub elapsed: Duration,
}

impl CaseOutcome {
    /// Returns true when the case passed.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.failure.is_none()
    }

    /// Returns the human-readable report line.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.failure {
            None => format!("✅ {} - Success", self.name),
            Some(failure) => format!("❌ {} - {failure}", self.name),
        }
    }

    /// Returns the `(success, message)` pair.
    #[must_use]
    pub fn into_pair(self) -> (bool, String) {
        (self.success(), self.message())
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Sequential HTTP runner bound to one proxy.
pub struct ProbeRunner {
    /// Pooled client reused across cases.
    client: Client,
    /// Target settings.
    settings: RunnerSettings,
}

impl ProbeRunner {
    /// Builds a runner and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when the base domain is unusable or the client
    /// cannot be constructed.
    pub fn new(settings: RunnerSettings) -> Result<Self, RunnerError> {
        let host = base_host(&settings)?;
        let mut builder = Client::builder().timeout(settings.timeout).redirect(Policy::none());
        if let Some(ip) = settings.resolve_to {
            for provider in Provider::ALL {
                let domain = format!("{}.{host}", provider.subdomain());
                builder = builder.resolve(&domain, SocketAddr::new(ip, 0));
            }
        }
        let client = builder.build().map_err(|err| RunnerError::Client(err.to_string()))?;
        Ok(Self {
            client,
            settings,
        })
    }

    /// Returns the runner settings.
    #[must_use]
    pub const fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Builds `{scheme}://{subdomain}.{base_domain}{path}`.
    #[must_use]
    pub fn build_url(&self, subdomain: &str, path: &str) -> String {
        format!("{}://{subdomain}.{}{path}", self.settings.scheme.as_str(), self.settings.base_domain)
    }

    /// Runs a single case and reports its outcome.
    ///
    /// Never fails: transport errors and unexpected responses are reported
    /// through [`CaseOutcome::failure`].
    pub async fn run_test_case(&self, case: &TestCase) -> CaseOutcome {
        let url = self.build_url(&case.subdomain, &case.path);
        let started = Instant::now();
        let (status, result) = match self.send(case, &url).await {
            Ok(response) => {
                let status = response.status().as_u16();
                let result = read_body_capped(response, MAX_RESPONSE_BYTES, self.settings.timeout)
                    .await
                    .and_then(|body| evaluate(case, status, &String::from_utf8_lossy(&body)));
                (Some(status), result)
            }
            Err(failure) => (None, Err(failure)),
        };
        CaseOutcome {
            name: case.name.clone(),
            phase: case.phase(),
            url,
            status,
            failure: result.err(),
            elapsed: started.elapsed(),
        }
    }

    /// Sends the case request and returns the response head.
    async fn send(&self, case: &TestCase, url: &str) -> Result<reqwest::Response, CaseFailure> {
        let headers = header_map(case)?;
        self
            .client
            .post(url)
            .headers(headers)
            .json(&case.json_data)
            .send()
            .await
            .map_err(|err| transport_failure(&err, self.settings.timeout))
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Checks an observed status and body against a case's expectations.
///
/// # Errors
///
/// Returns the first [`CaseFailure`] found: status mismatch first, then JSON
/// parsing, then the violation marker. An empty marker counts as no marker.
pub fn evaluate(case: &TestCase, status: u16, body: &str) -> Result<(), CaseFailure> {
    if status != case.expected_status {
        return Err(CaseFailure::UnexpectedStatus {
            status,
            expected: case.expected_status,
            preview: body.chars().take(RESPONSE_PREVIEW_CHARS).collect(),
        });
    }
    if case.is_trigger
        && let Some(marker) = case.expected_violation.as_ref().filter(|marker| !marker.is_empty())
    {
        let parsed: Value = serde_json::from_str(body).map_err(|_| CaseFailure::InvalidJson)?;
        if !parsed.to_string().contains(marker.as_str()) {
            return Err(CaseFailure::ViolationMissing {
                marker: marker.clone(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the host portion of the base domain, validating it as a URL authority.
fn base_host(settings: &RunnerSettings) -> Result<String, RunnerError> {
    let domain = settings.base_domain.trim();
    let invalid = |reason: &str| RunnerError::InvalidBaseDomain {
        domain: settings.base_domain.clone(),
        reason: reason.to_string(),
    };
    if domain.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if domain.contains("://") || domain.contains('/') {
        return Err(invalid("must not include a scheme or path"));
    }
    let url = Url::parse(&format!("{}://{domain}/", settings.scheme.as_str()))
        .map_err(|err| invalid(&err.to_string()))?;
    url.host_str().map(str::to_string).ok_or_else(|| invalid("missing host"))
}

/// Converts case headers into a reqwest header map.
fn header_map(case: &TestCase) -> Result<HeaderMap, CaseFailure> {
    let mut headers = HeaderMap::new();
    for (name, value) in &case.headers {
        let header_name = HeaderName::from_str(name)
            .map_err(|_| CaseFailure::Transport(format!("invalid header name '{name}'")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| CaseFailure::Transport(format!("invalid value for header '{name}'")))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Maps a reqwest error to a transport failure, naming timeouts explicitly.
fn transport_failure(err: &reqwest::Error, timeout: Duration) -> CaseFailure {
    if err.is_timeout() {
        return CaseFailure::Transport(format!(
            "request timed out after {} ms: {err}",
            timeout.as_millis()
        ));
    }
    CaseFailure::Transport(err.to_string())
}

/// Reads at most `limit` bytes of a response body and drops the rest.
async fn read_body_capped(
    mut response: reqwest::Response,
    limit: usize,
    timeout: Duration,
) -> Result<Vec<u8>, CaseFailure> {
    let mut body = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| transport_failure(&err, timeout))?
    {
        let room = limit.saturating_sub(body.len());
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
