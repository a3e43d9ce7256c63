// crates/llm-probe-cli/src/main.rs
// ============================================================================
// Module: LLM Probe CLI
// Description: Command-line entry point for the LLM proxy probe.
// Purpose: Resolve configuration, build the catalog, and run the suite.
// Dependencies: clap, llm-probe-core, rand, tokio
// ============================================================================

//! ## Overview
//! `llm-probe` sends the fixed provider catalog through an LLM-routing proxy
//! and reports one line per case. With no arguments it targets the default
//! proxy domain and exits 0 regardless of case outcomes; `--fail-on-error`
//! turns any failed case into a non-zero exit.
//!
//! Configuration and client-construction errors are fatal and exit 1 before
//! any request is sent.

mod config;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::ValueEnum;
use llm_probe_core::FileEventSink;
use llm_probe_core::NoopEventSink;
use llm_probe_core::ProbeRunner;
use llm_probe_core::RunEventSink;
use llm_probe_core::Scheme;
use llm_probe_core::StderrEventSink;
use llm_probe_core::SuiteReport;
use llm_probe_core::TestCase;
use llm_probe_core::build_catalog;
use llm_probe_core::partition;
use llm_probe_core::run_test_suite;
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::config::CliOverrides;
use crate::config::ConfigError;
use crate::config::EnvOverrides;
use crate::config::EventLogTarget;
use crate::config::FileConfig;
use crate::config::ProbeConfig;

// ============================================================================
// SECTION: CLI Definitions
// ============================================================================

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "llm-probe",
    version,
    about = "Send provider test cases through an LLM-routing proxy and report the outcomes."
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Proxy domain appended to each provider subdomain.
    #[arg(long, value_name = "DOMAIN")]
    base_domain: Option<String>,
    /// URL scheme used to reach the proxy.
    #[arg(long, value_enum, value_name = "SCHEME")]
    scheme: Option<SchemeArg>,
    /// Route every provider host to this address instead of using DNS.
    #[arg(long, value_name = "IP")]
    resolve_to: Option<IpAddr>,
    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
    /// Pause after each case in milliseconds.
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,
    /// Bearer token sent with every request.
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,
    /// Seed for user-agent selection.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Append JSON-lines run events to this file (`-` for stderr).
    #[arg(long, value_name = "PATH")]
    event_log: Option<PathBuf>,
    /// Print the catalog without sending any request.
    #[arg(long)]
    list: bool,
    /// Exit non-zero when any case fails.
    #[arg(long)]
    fail_on_error: bool,
}

impl Cli {
    /// Extracts the flag configuration layer.
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            base_domain: self.base_domain.clone(),
            scheme: self.scheme.map(Scheme::from),
            resolve_to: self.resolve_to,
            timeout_secs: self.timeout_secs,
            delay_ms: self.delay_ms,
            api_key: self.api_key.clone(),
            seed: self.seed,
            event_log: self.event_log.clone(),
            fail_on_error: self.fail_on_error,
        }
    }
}

/// URL scheme accepted on the command line.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum SchemeArg {
    /// TLS with certificate verification.
    Https,
    /// Plain HTTP for local mock proxies.
    Http,
}

impl From<SchemeArg> for Scheme {
    fn from(value: SchemeArg) -> Self {
        match value {
            SchemeArg::Https => Self::Https,
            SchemeArg::Http => Self::Http,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        Self::new(error.to_string())
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Resolves configuration and runs the suite or lists the catalog.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let runner = ProbeRunner::new(config.runner.clone())
        .map_err(|err| CliError::new(format!("failed to build http client: {err}")))?;
    let mut rng = config.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let cases = build_catalog(&config.catalog, &mut rng);

    if cli.list {
        write_catalog(&runner, &cases)?;
        return Ok(ExitCode::SUCCESS);
    }

    let sink = open_event_sink(config.event_log.as_ref())?;
    let mut stdout = std::io::stdout();
    let report = run_test_suite(&runner, &cases, &config.suite, &mut stdout, sink.as_ref())
        .await
        .map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&summary_line(&report))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;

    if config.fail_on_error && !report.all_passed() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Merges the file, environment, and flag layers.
fn load_config(cli: &Cli) -> CliResult<ProbeConfig> {
    let file = cli.config.as_deref().map(FileConfig::load).transpose()?;
    let env = EnvOverrides::load().map_err(ConfigError::Env)?;
    Ok(ProbeConfig::resolve(file, env, cli.overrides())?)
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Opens the configured event sink.
fn open_event_sink(target: Option<&EventLogTarget>) -> CliResult<Box<dyn RunEventSink>> {
    match target {
        None => Ok(Box::new(NoopEventSink)),
        Some(EventLogTarget::Stderr) => Ok(Box::new(StderrEventSink)),
        Some(EventLogTarget::File(path)) => FileEventSink::new(path)
            .map(|sink| Box::new(sink) as Box<dyn RunEventSink>)
            .map_err(|err| {
                CliError::new(format!("failed to open event log {}: {err}", path.display()))
            }),
    }
}

/// Prints one line per case in execution order: phase, method, URL, and name.
fn write_catalog(runner: &ProbeRunner, cases: &[TestCase]) -> CliResult<()> {
    let (non_trigger, trigger) = partition(cases);
    for case in non_trigger.into_iter().chain(trigger) {
        let line = format!(
            "{:<11} POST {} {}",
            case.phase().as_str(),
            runner.build_url(&case.subdomain, &case.path),
            case.name
        );
        write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(())
}

/// Formats the closing summary line.
fn summary_line(report: &SuiteReport) -> String {
    format!("\n📊 Summary: {} passed, {} failed", report.passed(), report.failed())
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
