// crates/llm-probe-core/src/lib.rs
// ============================================================================
// Module: LLM Probe Core Library
// Description: Test-case model, catalog, runner, and suite driver.
// Purpose: Exercise an external LLM-routing proxy over HTTP.
// Dependencies: rand, reqwest, serde, serde_json, thiserror, tokio, url
// ============================================================================

//! ## Overview
//! `llm-probe-core` sends declarative HTTP scenarios to provider-specific
//! subdomains of an LLM-routing proxy and checks the observed status codes
//! and policy-violation markers. The proxy itself is an external collaborator
//! reached only over HTTP.
//!
//! Execution is strictly sequential: one request in flight at a time, with a
//! fixed courtesy delay between requests. Per-case failures never abort the
//! suite.
//!
//! Security posture: proxy responses are untrusted; bodies are size-limited
//! and bearer tokens are never written to run events.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod case;
pub mod catalog;
pub mod events;
pub mod runner;
pub mod suite;


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use case::CasePhase;
pub use case::Provider;
pub use case::TestCase;
pub use catalog::CatalogSettings;
pub use catalog::USER_AGENTS;
pub use catalog::build_catalog;
pub use events::FileEventSink;
pub use events::NoopEventSink;
pub use events::RunEvent;
pub use events::RunEventSink;
pub use events::StderrEventSink;
pub use runner::CaseFailure;
pub use runner::CaseOutcome;
pub use runner::ProbeRunner;
pub use runner::RunnerError;
pub use runner::RunnerSettings;
pub use runner::Scheme;
pub use suite::SuiteError;
pub use suite::SuiteReport;
pub use suite::SuiteSettings;
pub use suite::partition;
pub use suite::run_test_suite;
