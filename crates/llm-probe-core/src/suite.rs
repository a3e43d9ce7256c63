// crates/llm-probe-core/src/suite.rs
// ============================================================================
// Module: Suite Driver
// Description: Two-phase sequential execution of the test-case catalog.
// Purpose: Run non-trigger cases, then trigger cases, pacing every request.
// Dependencies: thiserror, tokio
// ============================================================================

//! ## Overview
//! The suite partitions the catalog into non-trigger and trigger subsets,
//! keeping catalog order within each, and runs them in that order. Every case
//! is followed by the same courtesy delay regardless of its outcome. Console
//! lines go to an injected writer; structured events go to a
//! [`RunEventSink`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Write;
use std::time::Duration;

use thiserror::Error;

use crate::case::CasePhase;
use crate::case::TestCase;
use crate::events::RunEvent;
use crate::events::RunEventSink;
use crate::events::now_ms;
use crate::runner::CaseOutcome;
use crate::runner::ProbeRunner;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Pause after each request when none is configured.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(500);

// ============================================================================
// SECTION: Types
// ============================================================================

/// Suite pacing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteSettings {
    /// Pause after each case.
    pub delay: Duration,
}

impl Default for SuiteSettings {
    fn default() -> Self {
        Self {
            delay: DEFAULT_REQUEST_DELAY,
        }
    }
}

/// Errors that stop the suite.
///
/// # Invariants
/// - Case failures are never reported here; only console output can fail.
#[derive(Debug, Error)]
pub enum SuiteError {
    /// Writing a report line failed.
    #[error("failed to write suite output: {0}")]
    Output(#[from] io::Error),
}

/// Outcomes of a completed suite, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
    /// Case outcomes in the order they ran.
    outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    /// Returns the case outcomes in execution order.
    #[must_use]
    pub fn outcomes(&self) -> &[CaseOutcome] {
        &self.outcomes
    }

    /// Number of passing cases.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.success()).count()
    }

    /// Number of failing cases.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    /// Returns true when every case passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Splits cases into `(non_trigger, trigger)`, preserving catalog order.
#[must_use]
pub fn partition(cases: &[TestCase]) -> (Vec<&TestCase>, Vec<&TestCase>) {
    cases.iter().partition(|case| !case.is_trigger)
}

/// Runs the non-trigger phase, then the trigger phase.
///
/// # Errors
///
/// Returns [`SuiteError`] only when writing to `out` fails. Case failures are
/// reported in the returned [`SuiteReport`].
pub async fn run_test_suite<W: Write>(
    runner: &ProbeRunner,
    cases: &[TestCase],
    settings: &SuiteSettings,
    out: &mut W,
    sink: &dyn RunEventSink,
) -> Result<SuiteReport, SuiteError> {
    writeln!(out, "🚀 Starting LLM Proxy Test Suite - {} test cases\n", cases.len())?;
    sink.record(&RunEvent::SuiteStarted {
        timestamp_ms: now_ms(),
        total_cases: cases.len(),
        base_domain: runner.settings().base_domain.clone(),
    });

    let (non_trigger, trigger) = partition(cases);
    let mut report = SuiteReport::default();
    for (phase, batch) in [(CasePhase::NonTrigger, non_trigger), (CasePhase::Trigger, trigger)] {
        writeln!(out, "{}", phase_banner(phase))?;
        for case in batch {
            let outcome = runner.run_test_case(case).await;
            writeln!(out, "{}", outcome.message())?;
            out.flush()?;
            sink.record(&RunEvent::case_finished(&outcome));
            report.outcomes.push(outcome);
            tokio::time::sleep(settings.delay).await;
        }
    }

    sink.record(&RunEvent::SuiteFinished {
        timestamp_ms: now_ms(),
        passed: report.passed(),
        failed: report.failed(),
    });
    Ok(report)
}

/// Console banner printed before each phase.
const fn phase_banner(phase: CasePhase) -> &'static str {
    match phase {
        CasePhase::NonTrigger => "🔍 Running non-trigger tests...",
        CasePhase::Trigger => "\n⚠️  Running trigger tests...",
    }
}
