// crates/llm-probe-cli/src/config/env.rs
// ============================================================================
// Module: Probe Environment
// Description: Environment-backed overrides for the probe configuration.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8, empty values, and malformed numbers or
//! booleans fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env::VarError;
use std::time::Duration;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for probe configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEnv {
    /// Proxy domain override.
    BaseDomain,
    /// Bearer token override.
    ApiKey,
    /// Request timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Inter-request delay override in milliseconds.
    DelayMs,
    /// Exit non-zero on any case failure (`true`/`false` or `1`/`0`).
    FailOnError,
}

impl ProbeEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseDomain => "LLM_PROBE_BASE_DOMAIN",
            Self::ApiKey => "LLM_PROBE_API_KEY",
            Self::TimeoutSeconds => "LLM_PROBE_TIMEOUT_SEC",
            Self::DelayMs => "LLM_PROBE_DELAY_MS",
            Self::FailOnError => "LLM_PROBE_FAIL_ON_ERROR",
        }
    }
}

// ============================================================================
// SECTION: Override Types
// ============================================================================

/// Typed overrides derived from environment variables.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    /// Proxy domain override.
    pub base_domain: Option<String>,
    /// Bearer token override.
    pub api_key: Option<String>,
    /// Request timeout override.
    pub timeout: Option<Duration>,
    /// Inter-request delay override.
    pub delay: Option<Duration>,
    /// Exit-code policy override.
    pub fail_on_error: Option<bool>,
}

impl EnvOverrides {
    /// Loads overrides from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or fails validation (for example, an invalid timeout or boolean value).
    pub fn load() -> Result<Self, String> {
        let base_domain = read_env_nonempty(ProbeEnv::BaseDomain.as_str())?;
        let api_key = read_env_nonempty(ProbeEnv::ApiKey.as_str())?;
        let timeout = read_env_nonempty(ProbeEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(ProbeEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let delay = read_env_nonempty(ProbeEnv::DelayMs.as_str())?
            .map(|value| parse_delay_ms(ProbeEnv::DelayMs.as_str(), &value))
            .transpose()?;
        let fail_on_error = read_env_nonempty(ProbeEnv::FailOnError.as_str())?
            .map(|value| parse_bool(ProbeEnv::FailOnError.as_str(), &value))
            .transpose()?;
        Ok(Self {
            base_domain,
            api_key,
            timeout,
            delay,
            fail_on_error,
        })
    }
}

impl std::fmt::Debug for EnvOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvOverrides")
            .field("base_domain", &self.base_domain)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("delay", &self.delay)
            .field("fail_on_error", &self.fail_on_error)
            .finish()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a variable, rejecting values that are not UTF-8.
///
/// # Errors
///
/// Returns an error naming the variable when its value is not UTF-8.
fn read_utf8(name: &str) -> Result<Option<String>, String> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(format!("{name} is not valid UTF-8")),
    }
}

/// Reads a variable and returns its trimmed value; blank values are errors.
///
/// # Errors
///
/// Returns an error when the variable is set to whitespace only.
fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    let Some(raw) = read_utf8(name)? else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Err(format!("{name} is set but blank"));
    }
    Ok(Some(value.to_string()))
}

/// Parses a request timeout given in whole seconds; zero is rejected.
///
/// # Errors
///
/// Returns an error quoting the rejected value.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, String> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(format!("{name}: timeout must be at least 1 second")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(format!("{name}: expected whole seconds, got '{}'", raw.trim())),
    }
}

/// Parses a delay given in whole milliseconds; zero disables the pause.
///
/// # Errors
///
/// Returns an error quoting the rejected value.
fn parse_delay_ms(name: &str, raw: &str) -> Result<Duration, String> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| format!("{name}: expected whole milliseconds, got '{}'", raw.trim()))
}

/// Parses `true`/`false` (any case) or `1`/`0`.
///
/// # Errors
///
/// Returns an error quoting the rejected value.
fn parse_bool(name: &str, raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(format!("{name}: expected true, false, 1 or 0, got '{other}'")),
    }
}
