// trade-gate-cli/src/config.rs
// ============================================================================
// Module: Trade Gate Configuration
// Description: Configuration loading and validation for the CLI.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, trade-gate-core
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with a hard size limit and
//! validated field by field; any invalid value fails the whole load. Secrets
//! never live in the file: API tokens come from environment variables only.
//! A missing file is not an error — every section carries working defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use trade_gate_core::SafetyPolicy;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "trade-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TRADE_GATE_CONFIG";
/// Environment variable carrying a ready-to-use backend access token.
pub const ACCESS_TOKEN_ENV_VAR: &str = "TRADE_GATE_ACCESS_TOKEN";
/// Environment variable carrying the long-lived backend secret.
pub const SECRET_TOKEN_ENV_VAR: &str = "TRADE_GATE_SECRET_TOKEN";
/// Environment variable carrying the model provider API key.
pub const LLM_API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum accepted request timeout in milliseconds.
const MAX_TIMEOUT_MS: u64 = 300_000;
/// Maximum accepted confirmation window in milliseconds.
const MAX_CONFIRMATION_TTL_MS: u64 = 3_600_000;
/// Maximum accepted retry attempts per execution.
const MAX_ATTEMPTS: u32 = 10;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config read failed: {0}")]
    Io(String),
    /// Config file failed to parse as TOML.
    #[error("config parse failed: {0}")]
    Parse(String),
    /// A config value failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Resolution strategy selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Deterministic offline mapper only.
    #[default]
    Offline,
    /// Model-backed extraction with offline fallback.
    Llm,
}

/// Endpoint catalog sources.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Catalog file replacing the bundled one, when set.
    pub catalog_path: Option<PathBuf>,
    /// Additional (generated) catalog merged after the primary one.
    pub extra_catalog_path: Option<PathBuf>,
}

/// Resolution pipeline settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolutionSection {
    /// Strategy selection (`offline` or `llm`).
    pub mode: ResolutionMode,
    /// Minimum intent confidence accepted without disambiguation.
    pub min_confidence: f64,
    /// Market attached to bare tickers.
    pub default_market: String,
    /// Account used when the query names none.
    pub default_account: Option<String>,
    /// Default look-back window for bar requests without an interval.
    pub bars_default_days: u32,
    /// Few-shot training file (`question;METHOD;path` lines).
    pub examples_path: Option<PathBuf>,
}

impl Default for ResolutionSection {
    fn default() -> Self {
        Self {
            mode: ResolutionMode::Offline,
            min_confidence: 0.25,
            default_market: "MISX".to_string(),
            default_account: None,
            bars_default_days: 30,
            examples_path: None,
        }
    }
}

/// Model provider settings; the API key comes from the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// Chat API base URL.
    pub base_url: String,
    /// Model identifier requested from the provider.
    pub model: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-4o".to_string(),
            timeout_ms: 60_000,
        }
    }
}

/// Trading backend adapter settings; tokens come from the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdapterSection {
    /// Trading backend base URL.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
    /// Secret-exchange path on the backend.
    pub auth_path: String,
}

impl Default for AdapterSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.finam.ru".to_string(),
            timeout_ms: 30_000,
            max_response_bytes: 4 * 1024 * 1024,
            user_agent: "trade-gate/0.1".to_string(),
            auth_path: "/v1/sessions".to_string(),
        }
    }
}

/// Execution router settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterSection {
    /// Default cache TTL in seconds for read responses.
    pub cache_ttl_secs: u64,
    /// Sustained backend call rate in calls per second.
    pub rate_per_sec: u32,
    /// Burst capacity of the rate limiter.
    pub burst: u32,
    /// Maximum adapter attempts per execution.
    pub max_attempts: u32,
    /// Backoff delays in milliseconds between attempts.
    pub backoff_ms: Vec<u64>,
    /// Append-only audit trail file; stderr when unset.
    pub audit_path: Option<PathBuf>,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            rate_per_sec: 5,
            burst: 10,
            max_attempts: 4,
            backoff_ms: vec![100, 300, 700, 1500],
            audit_path: None,
        }
    }
}

// ============================================================================
// SECTION: Top-Level Configuration
// ============================================================================

/// Complete Trade Gate configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TradeGateConfig {
    /// Endpoint catalog sources.
    pub registry: RegistrySection,
    /// Resolution pipeline settings.
    pub resolution: ResolutionSection,
    /// Safety gate policy.
    pub safety: SafetyPolicy,
    /// Model provider settings.
    pub llm: LlmSection,
    /// Trading backend adapter settings.
    pub adapter: AdapterSection,
    /// Execution router settings.
    pub router: RouterSection,
}

impl TradeGateConfig {
    /// Loads configuration from a file, the environment override, or defaults.
    ///
    /// Resolution order: explicit path, then `TRADE_GATE_CONFIG`, then
    /// `trade-gate.toml` in the working directory. A missing default file
    /// yields the built-in defaults; an explicit or env path must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));
        let resolved = match explicit {
            Some(path) => path,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_NAME);
                if !default.is_file() {
                    let config = Self::default();
                    config.validate()?;
                    return Ok(config);
                }
                default
            }
        };

        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section into its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let confidence = self.resolution.min_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ConfigError::Invalid(
                "resolution.min_confidence must be within [0, 1]".to_string(),
            ));
        }
        if !(1..=365).contains(&self.resolution.bars_default_days) {
            return Err(ConfigError::Invalid(
                "resolution.bars_default_days must be within [1, 365]".to_string(),
            ));
        }
        if self.resolution.default_market.is_empty() {
            return Err(ConfigError::Invalid(
                "resolution.default_market must be set".to_string(),
            ));
        }
        validate_timeout("llm.timeout_ms", self.llm.timeout_ms)?;
        validate_timeout("adapter.timeout_ms", self.adapter.timeout_ms)?;
        if self.adapter.base_url.is_empty() {
            return Err(ConfigError::Invalid("adapter.base_url must be set".to_string()));
        }
        if self.adapter.max_response_bytes == 0 {
            return Err(ConfigError::Invalid(
                "adapter.max_response_bytes must be positive".to_string(),
            ));
        }
        if !self.adapter.auth_path.starts_with('/') {
            return Err(ConfigError::Invalid(
                "adapter.auth_path must start with '/'".to_string(),
            ));
        }
        if self.router.rate_per_sec == 0 || self.router.burst == 0 {
            return Err(ConfigError::Invalid(
                "router.rate_per_sec and router.burst must be positive".to_string(),
            ));
        }
        if !(1..=MAX_ATTEMPTS).contains(&self.router.max_attempts) {
            return Err(ConfigError::Invalid(format!(
                "router.max_attempts must be within [1, {MAX_ATTEMPTS}]"
            )));
        }
        if self.safety.max_order_quantity <= 0 {
            return Err(ConfigError::Invalid(
                "safety.max_order_quantity must be positive".to_string(),
            ));
        }
        if self.safety.confirmation_ttl_ms == 0
            || self.safety.confirmation_ttl_ms > MAX_CONFIRMATION_TTL_MS
        {
            return Err(ConfigError::Invalid(format!(
                "safety.confirmation_ttl_ms must be within [1, {MAX_CONFIRMATION_TTL_MS}]"
            )));
        }
        Ok(())
    }
}

/// Validates one timeout value into the accepted range.
fn validate_timeout(name: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_TIMEOUT_MS {
        return Err(ConfigError::Invalid(format!(
            "{name} must be within [1, {MAX_TIMEOUT_MS}]"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Secrets
// ============================================================================

/// Reads a non-empty secret from the environment.
fn secret_from_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Returns the backend access token from the environment, when set.
#[must_use]
pub fn access_token() -> Option<String> {
    secret_from_env(ACCESS_TOKEN_ENV_VAR)
}

/// Returns the long-lived backend secret from the environment, when set.
#[must_use]
pub fn secret_token() -> Option<String> {
    secret_from_env(SECRET_TOKEN_ENV_VAR)
}

/// Returns the model provider API key from the environment, when set.
#[must_use]
pub fn llm_api_key() -> Option<String> {
    secret_from_env(LLM_API_KEY_ENV_VAR)
}
