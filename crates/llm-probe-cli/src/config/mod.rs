// crates/llm-probe-cli/src/config/mod.rs
// ============================================================================
// Module: Probe Configuration
// Description: Layered configuration for the probe CLI.
// Purpose: Merge defaults, a TOML file, environment, and flags into one config.
// Dependencies: llm-probe-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration resolves in four layers, each overriding the previous one:
//! built-in defaults, an optional TOML file, `LLM_PROBE_*` environment
//! variables, then command-line flags. The merged result is validated once and
//! fails closed before any request is sent.
//!
//! Security posture: the config file is untrusted input; it is size-limited and
//! unknown keys are rejected. API keys never appear in debug output.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod env;


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use llm_probe_core::CatalogSettings;
use llm_probe_core::RunnerSettings;
use llm_probe_core::Scheme;
use llm_probe_core::SuiteSettings;
use serde::Deserialize;
use thiserror::Error;

pub use self::env::EnvOverrides;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum config file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;

/// Event log path that selects stderr instead of a file.
const STDERR_EVENT_LOG: &str = "-";

// ============================================================================
// SECTION: File Layer
// ============================================================================

/// TOML configuration file contents.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Proxy addressing.
    #[serde(default)]
    pub target: TargetSection,
    /// Suite pacing and reporting.
    #[serde(default)]
    pub suite: SuiteSection,
    /// Credentials and provider headers.
    #[serde(default)]
    pub credentials: CredentialsSection,
}

/// `[target]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSection {
    /// Proxy domain.
    pub base_domain: Option<String>,
    /// URL scheme (`https` or `http`).
    pub scheme: Option<Scheme>,
    /// DNS override for every provider host.
    pub resolve_to: Option<IpAddr>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// `[suite]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteSection {
    /// Pause after each case in milliseconds.
    pub delay_ms: Option<u64>,
    /// Seed for user-agent selection.
    pub seed: Option<u64>,
    /// Exit non-zero when any case fails.
    pub fail_on_error: Option<bool>,
    /// JSON-lines event log path (`-` for stderr).
    pub event_log: Option<PathBuf>,
}

/// `[credentials]` section.
#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsSection {
    /// Bearer token.
    pub api_key: Option<String>,
    /// `OpenAI-Organization` header value.
    pub openai_organization: Option<String>,
    /// `anthropic-version` header value.
    pub anthropic_version: Option<String>,
}

impl fmt::Debug for CredentialsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsSection")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_organization", &self.openai_organization)
            .field("anthropic_version", &self.anthropic_version)
            .finish()
    }
}

impl FileConfig {
    /// Loads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, exceeds the size
    /// limit, is not UTF-8, or does not match the expected schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}

// ============================================================================
// SECTION: Flag Layer
// ============================================================================

/// Values supplied on the command line.
#[derive(Default, Clone)]
pub struct CliOverrides {
    /// `--base-domain`.
    pub base_domain: Option<String>,
    /// `--scheme`.
    pub scheme: Option<Scheme>,
    /// `--resolve-to`.
    pub resolve_to: Option<IpAddr>,
    /// `--timeout-secs`.
    pub timeout_secs: Option<u64>,
    /// `--delay-ms`.
    pub delay_ms: Option<u64>,
    /// `--api-key`.
    pub api_key: Option<String>,
    /// `--seed`.
    pub seed: Option<u64>,
    /// `--event-log`.
    pub event_log: Option<PathBuf>,
    /// `--fail-on-error`; a set flag always wins.
    pub fail_on_error: bool,
}

// ============================================================================
// SECTION: Resolved Config
// ============================================================================

/// Where run events are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventLogTarget {
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File(PathBuf),
}

/// Validated probe configuration.
///
/// Debug output redacts the API key through [`CatalogSettings`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeConfig {
    /// HTTP runner settings.
    pub runner: RunnerSettings,
    /// Catalog credentials and provider headers.
    pub catalog: CatalogSettings,
    /// Suite pacing.
    pub suite: SuiteSettings,
    /// Seed for user-agent selection; entropy when absent.
    pub seed: Option<u64>,
    /// Optional event log destination.
    pub event_log: Option<EventLogTarget>,
    /// Exit non-zero when any case fails.
    pub fail_on_error: bool,
}

impl ProbeConfig {
    /// Merges every layer over the defaults and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the merged values are unusable.
    pub fn resolve(
        file: Option<FileConfig>,
        env: EnvOverrides,
        cli: CliOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(file) = file {
            config.apply_file(file);
        }
        config.apply_env(env);
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Applies the TOML layer.
    fn apply_file(&mut self, file: FileConfig) {
        let FileConfig {
            target,
            suite,
            credentials,
        } = file;
        if let Some(base_domain) = target.base_domain {
            self.runner.base_domain = base_domain;
        }
        if let Some(scheme) = target.scheme {
            self.runner.scheme = scheme;
        }
        if target.resolve_to.is_some() {
            self.runner.resolve_to = target.resolve_to;
        }
        if let Some(secs) = target.timeout_secs {
            self.runner.timeout = Duration::from_secs(secs);
        }
        if let Some(delay_ms) = suite.delay_ms {
            self.suite.delay = Duration::from_millis(delay_ms);
        }
        if suite.seed.is_some() {
            self.seed = suite.seed;
        }
        if let Some(fail_on_error) = suite.fail_on_error {
            self.fail_on_error = fail_on_error;
        }
        if let Some(path) = suite.event_log {
            self.event_log = Some(event_log_target(path));
        }
        if let Some(api_key) = credentials.api_key {
            self.catalog.api_key = api_key;
        }
        if let Some(organization) = credentials.openai_organization {
            self.catalog.openai_organization = organization;
        }
        if let Some(version) = credentials.anthropic_version {
            self.catalog.anthropic_version = version;
        }
    }

    /// Applies the environment layer.
    fn apply_env(&mut self, env: EnvOverrides) {
        if let Some(base_domain) = env.base_domain {
            self.runner.base_domain = base_domain;
        }
        if let Some(api_key) = env.api_key {
            self.catalog.api_key = api_key;
        }
        if let Some(timeout) = env.timeout {
            self.runner.timeout = timeout;
        }
        if let Some(delay) = env.delay {
            self.suite.delay = delay;
        }
        if let Some(fail_on_error) = env.fail_on_error {
            self.fail_on_error = fail_on_error;
        }
    }

    /// Applies the flag layer.
    fn apply_cli(&mut self, cli: CliOverrides) {
        if let Some(base_domain) = cli.base_domain {
            self.runner.base_domain = base_domain;
        }
        if let Some(scheme) = cli.scheme {
            self.runner.scheme = scheme;
        }
        if cli.resolve_to.is_some() {
            self.runner.resolve_to = cli.resolve_to;
        }
        if let Some(secs) = cli.timeout_secs {
            self.runner.timeout = Duration::from_secs(secs);
        }
        if let Some(delay_ms) = cli.delay_ms {
            self.suite.delay = Duration::from_millis(delay_ms);
        }
        if let Some(api_key) = cli.api_key {
            self.catalog.api_key = api_key;
        }
        if cli.seed.is_some() {
            self.seed = cli.seed;
        }
        if let Some(path) = cli.event_log {
            self.event_log = Some(event_log_target(path));
        }
        if cli.fail_on_error {
            self.fail_on_error = true;
        }
    }

    /// Validates the merged configuration.
    fn validate(&mut self) -> Result<(), ConfigError> {
        let base_domain = self.runner.base_domain.trim();
        if base_domain.is_empty() {
            return Err(ConfigError::Invalid("base_domain must not be empty".to_string()));
        }
        if base_domain.contains("://") || base_domain.contains('/') {
            return Err(ConfigError::Invalid(
                "base_domain must be a host without scheme or path".to_string(),
            ));
        }
        self.runner.base_domain = base_domain.to_string();
        if self.runner.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be greater than zero".to_string()));
        }
        if self.catalog.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid("api_key must not be empty".to_string()));
        }
        if self.catalog.anthropic_version.trim().is_empty() {
            return Err(ConfigError::Invalid("anthropic_version must not be empty".to_string()));
        }
        if matches!(&self.event_log, Some(EventLogTarget::File(path)) if path.as_os_str().is_empty())
        {
            return Err(ConfigError::Invalid("event_log path must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Maps an event log path to its target.
fn event_log_target(path: PathBuf) -> EventLogTarget {
    if path.as_os_str() == STDERR_EVENT_LOG {
        EventLogTarget::Stderr
    } else {
        EventLogTarget::File(path)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Environment value rejected.
    #[error("config env error: {0}")]
    Env(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}
