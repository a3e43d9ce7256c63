// crates/llm-probe-core/src/case.rs
// ============================================================================
// Module: Test Case Model
// Description: Immutable descriptors for one HTTP probe scenario.
// Purpose: Carry target, payload, and expectations from catalog to runner.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`TestCase`] is fully specified when the catalog builds it and is never
//! mutated afterwards. The runner consumes each case exactly once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Status expected from the proxy when a case does not override it.
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

/// Header whose value is redacted in debug output.
const AUTHORIZATION_HEADER: &str = "Authorization";

// ============================================================================
// SECTION: Providers
// ============================================================================

/// Upstream providers reachable through the proxy by subdomain.
///
/// # Invariants
/// - Subdomains are stable; the proxy routes on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// `OpenAI` chat completions.
    OpenAi,
    /// Google `generateContent`.
    Google,
    /// Anthropic messages.
    Anthropic,
}

impl Provider {
    /// All providers in catalog order.
    pub const ALL: [Self; 3] = [Self::OpenAi, Self::Google, Self::Anthropic];

    /// Returns the proxy subdomain that routes to this provider.
    #[must_use]
    pub const fn subdomain(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Google => "google",
            Self::Anthropic => "anthropic",
        }
    }

    /// Returns the human-readable label used in case names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Google => "Google",
            Self::Anthropic => "Anthropic",
        }
    }
}

// ============================================================================
// SECTION: Phases
// ============================================================================

/// Execution phase a case belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CasePhase {
    /// Ordinary traffic that must pass through the proxy.
    NonTrigger,
    /// Content expected to provoke a policy-violation response.
    Trigger,
}

impl CasePhase {
    /// Returns a stable label for the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonTrigger => "non-trigger",
            Self::Trigger => "trigger",
        }
    }
}

// ============================================================================
// SECTION: Test Case
// ============================================================================

/// One HTTP scenario sent to the proxy.
///
/// # Invariants
/// - `expected_violation` is only consulted when `is_trigger` is true.
/// - Header names are stored as written; the catalog never emits duplicates.
#[derive(Clone, PartialEq)]
pub struct TestCase {
    /// Human-readable identifier, unique within a run by convention.
    pub name: String,
    /// Proxy subdomain selecting the upstream provider.
    pub subdomain: String,
    /// Request path including the leading slash.
    pub path: String,
    /// Request headers sent verbatim.
    pub headers: BTreeMap<String, String>,
    /// JSON request body.
    pub json_data: Value,
    /// HTTP status the proxy must return.
    pub expected_status: u16,
    /// Whether the case runs in the trigger phase.
    pub is_trigger: bool,
    /// Substring that must appear in the serialized response of a trigger case.
    pub expected_violation: Option<String>,
}

impl TestCase {
    /// Builds a non-trigger case expecting [`DEFAULT_EXPECTED_STATUS`].
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        subdomain: impl Into<String>,
        path: impl Into<String>,
        headers: BTreeMap<String, String>,
        json_data: Value,
    ) -> Self {
        Self {
            name: name.into(),
            subdomain: subdomain.into(),
            path: path.into(),
            headers,
            json_data,
            expected_status: DEFAULT_EXPECTED_STATUS,
            is_trigger: false,
            expected_violation: None,
        }
    }

    /// Turns the case into a trigger case expecting `status` and `marker`.
    #[must_use]
    pub fn expect_violation(mut self, status: u16, marker: impl Into<String>) -> Self {
        self.is_trigger = true;
        self.expected_status = status;
        self.expected_violation = Some(marker.into());
        self
    }

    /// Overrides the expected status without changing the phase.
    #[must_use]
    pub const fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Returns the execution phase of the case.
    #[must_use]
    pub const fn phase(&self) -> CasePhase {
        if self.is_trigger { CasePhase::Trigger } else { CasePhase::NonTrigger }
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case(AUTHORIZATION_HEADER) {
                    (name.as_str(), "<redacted>")
                } else {
                    (name.as_str(), value.as_str())
                }
            })
            .collect();
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("subdomain", &self.subdomain)
            .field("path", &self.path)
            .field("headers", &headers)
            .field("json_data", &self.json_data)
            .field("expected_status", &self.expected_status)
            .field("is_trigger", &self.is_trigger)
            .field("expected_violation", &self.expected_violation)
            .finish()
    }
}
