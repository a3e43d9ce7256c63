// crates/llm-probe-core/src/events.rs
// ============================================================================
// Module: Run Events
// Description: Structured JSON-lines events for suite and case progress.
// Purpose: Emit machine-readable run logs without a logging framework.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The suite driver reports progress through a [`RunEventSink`]. Sinks write
//! one JSON object per line to stderr or to an append-only file, or discard
//! events entirely. Events never carry request headers, so bearer tokens stay
//! out of logs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::case::CasePhase;
use crate::runner::CaseFailure;
use crate::runner::CaseOutcome;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Run event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// The suite is about to send its first request.
    SuiteStarted {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Number of cases in the catalog.
        total_cases: usize,
        /// Proxy domain under test.
        base_domain: String,
    },
    /// One case finished.
    CaseFinished {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Case name.
        name: String,
        /// Phase the case ran in.
        phase: CasePhase,
        /// Request URL.
        url: String,
        /// Whether the case passed.
        success: bool,
        /// HTTP status when a response arrived.
        status: Option<u16>,
        /// Failure label when the case failed.
        failure_kind: Option<&'static str>,
        /// Failure message when the case failed.
        detail: Option<String>,
        /// Request wall time in milliseconds.
        elapsed_ms: u128,
    },
    /// All phases completed.
    SuiteFinished {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Cases that passed.
        passed: usize,
        /// Cases that failed.
        failed: usize,
    },
}

impl RunEvent {
    /// Builds a [`RunEvent::CaseFinished`] event from an outcome.
    #[must_use]
    pub fn case_finished(outcome: &CaseOutcome) -> Self {
        Self::CaseFinished {
            timestamp_ms: now_ms(),
            name: outcome.name.clone(),
            phase: outcome.phase,
            url: outcome.url.clone(),
            success: outcome.success(),
            status: outcome.status,
            failure_kind: outcome.failure.as_ref().map(CaseFailure::kind),
            detail: outcome.failure.as_ref().map(ToString::to_string),
            elapsed_ms: outcome.elapsed.as_millis(),
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for run events.
pub trait RunEventSink: Send + Sync {
    /// Record a run event.
    fn record(&self, event: &RunEvent);
}

/// Sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl RunEventSink for StderrEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RunEventSink for FileEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op sink.
pub struct NoopEventSink;

impl RunEventSink for NoopEventSink {
    fn record(&self, _event: &RunEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Milliseconds since the Unix epoch, or zero if the clock is before it.
pub(crate) fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_millis())
}
