// crates/opspipe-config/src/config.rs
// ============================================================================
// Module: OpsPipe Configuration
// Description: Configuration loading and validation for OpsPipe.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits. Every
//! section validates its own bounds and an invalid value fails the whole
//! load; there is no degraded fallback. The signing secret is the only
//! required field with no default, so a gateway cannot boot unauthenticated
//! by accident.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "opspipe.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "OPSPIPE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Default bind address for the gateway.
const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024;
/// Maximum allowed request body size in bytes.
const MAX_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
/// Default executions admitted per breaker window.
const DEFAULT_BREAKER_MAX_EXECUTIONS: usize = 10;
/// Default breaker window length in milliseconds.
const DEFAULT_BREAKER_WINDOW_MS: i64 = 60_000;
/// Minimum breaker window length in milliseconds.
const MIN_BREAKER_WINDOW_MS: i64 = 100;
/// Maximum breaker window length in milliseconds.
const MAX_BREAKER_WINDOW_MS: i64 = 3_600_000;
/// Maximum executions admitted per breaker window.
const MAX_BREAKER_MAX_EXECUTIONS: usize = 100_000;
/// Default idempotency key TTL in seconds.
const DEFAULT_IDEMPOTENCY_TTL_SECONDS: u64 = 60;
/// Maximum idempotency key TTL in seconds.
const MAX_IDEMPOTENCY_TTL_SECONDS: u64 = 86_400;
/// Default retry count after the initial dispatch attempt.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Maximum retry count after the initial dispatch attempt.
const MAX_MAX_RETRIES: u32 = 10;
/// Default delay before the first retry in milliseconds.
const DEFAULT_BASE_DELAY_MS: u64 = 100;
/// Maximum delay before the first retry in milliseconds.
const MAX_BASE_DELAY_MS: u64 = 60_000;
/// Maximum number of configured redaction field names.
const MAX_REDACTION_FIELDS: usize = 256;
/// Maximum length of a single redaction field name.
const MAX_REDACTION_FIELD_LENGTH: usize = 128;
/// Default admission policy identifier.
const DEFAULT_GATE_POLICY: &str = "workflow_enabled";
/// Minimum signing secret length in bytes.
const MIN_SIGNING_SECRET_LENGTH: usize = 16;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem error while reading the config file.
    #[error("config io error: {0}")]
    Io(String),
    /// The config file is not valid TOML.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A config value violates a validation rule.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Root OpsPipe configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OpspipeConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Circuit breaker configuration.
    #[serde(default)]
    pub breaker: BreakerConfig,
    /// Idempotency guard configuration.
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
    /// Retry schedule configuration.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Log redaction configuration.
    #[serde(default)]
    pub redaction: RedactionConfig,
    /// Admission policy configuration.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Dispatch routing configuration.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl OpspipeConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path argument wins over the `OPSPIPE_CONFIG` environment variable,
    /// which wins over `opspipe.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
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

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any section is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.auth.validate()?;
        self.breaker.validate()?;
        self.idempotency.validate()?;
        self.retry.validate()?;
        self.redaction.validate()?;
        self.policy.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind must be set".to_string()));
        }
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_MAX_BODY_BYTES {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes out of range".to_string(),
            ));
        }
        Ok(())
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing secret for inbound bearer tokens.
    pub signing_secret: String,
}

impl AuthConfig {
    /// Validates authentication configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.signing_secret must be set".to_string()));
        }
        if self.signing_secret.len() < MIN_SIGNING_SECRET_LENGTH {
            return Err(ConfigError::Invalid("auth.signing_secret is too short".to_string()));
        }
        Ok(())
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BreakerConfig {
    /// Executions admitted per target inside one window.
    #[serde(default = "default_breaker_max_executions")]
    pub max_executions_per_window: usize,
    /// Window length in milliseconds.
    #[serde(default = "default_breaker_window_ms")]
    pub window_ms: i64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_executions_per_window: default_breaker_max_executions(),
            window_ms: default_breaker_window_ms(),
        }
    }
}

impl BreakerConfig {
    /// Validates breaker configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_executions_per_window == 0
            || self.max_executions_per_window > MAX_BREAKER_MAX_EXECUTIONS
        {
            return Err(ConfigError::Invalid(
                "breaker.max_executions_per_window out of range".to_string(),
            ));
        }
        if !(MIN_BREAKER_WINDOW_MS..=MAX_BREAKER_WINDOW_MS).contains(&self.window_ms) {
            return Err(ConfigError::Invalid("breaker.window_ms out of range".to_string()));
        }
        Ok(())
    }
}

/// Idempotency guard configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IdempotencyConfig {
    /// Key TTL in seconds.
    #[serde(default = "default_idempotency_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_idempotency_ttl_seconds(),
        }
    }
}

impl IdempotencyConfig {
    /// Validates idempotency configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_seconds == 0 || self.ttl_seconds > MAX_IDEMPOTENCY_TTL_SECONDS {
            return Err(ConfigError::Invalid(
                "idempotency.ttl_seconds out of range".to_string(),
            ));
        }
        Ok(())
    }
}

/// Retry schedule configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Retries attempted after the initial call.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Whether to widen each delay by random jitter.
    #[serde(default = "default_use_jitter")]
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            use_jitter: default_use_jitter(),
        }
    }
}

impl RetryConfig {
    /// Validates retry configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries > MAX_MAX_RETRIES {
            return Err(ConfigError::Invalid("retry.max_retries out of range".to_string()));
        }
        if self.base_delay_ms == 0 || self.base_delay_ms > MAX_BASE_DELAY_MS {
            return Err(ConfigError::Invalid("retry.base_delay_ms out of range".to_string()));
        }
        Ok(())
    }
}

/// Log redaction configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedactionConfig {
    /// Field names whose values are masked in audit output.
    #[serde(default)]
    pub pii_fields: Vec<String>,
}

impl RedactionConfig {
    /// Validates redaction configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.pii_fields.len() > MAX_REDACTION_FIELDS {
            return Err(ConfigError::Invalid("redaction.pii_fields too many entries".to_string()));
        }
        for field in &self.pii_fields {
            if field.trim().is_empty() || field.len() > MAX_REDACTION_FIELD_LENGTH {
                return Err(ConfigError::Invalid(
                    "redaction.pii_fields entry out of range".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Admission policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Policy identifier evaluated before any workflow is admitted.
    #[serde(default = "default_gate_policy")]
    pub gate_policy: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            gate_policy: default_gate_policy(),
        }
    }
}

impl PolicyConfig {
    /// Validates policy configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.gate_policy.trim().is_empty() {
            return Err(ConfigError::Invalid("policy.gate_policy must be set".to_string()));
        }
        Ok(())
    }
}

/// Dispatch routing mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Effects are logged, never sent anywhere.
    #[default]
    Logging,
}

/// Dispatch routing configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchConfig {
    /// Dispatcher implementation selection.
    #[serde(default)]
    pub mode: DispatchMode,
}

// ============================================================================
// SECTION: Defaults and Path Resolution
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default breaker execution budget.
const fn default_breaker_max_executions() -> usize {
    DEFAULT_BREAKER_MAX_EXECUTIONS
}

/// Default breaker window length.
const fn default_breaker_window_ms() -> i64 {
    DEFAULT_BREAKER_WINDOW_MS
}

/// Default idempotency TTL.
const fn default_idempotency_ttl_seconds() -> u64 {
    DEFAULT_IDEMPOTENCY_TTL_SECONDS
}

/// Default retry count.
const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

/// Default base delay.
const fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

/// Jitter is on by default.
const fn default_use_jitter() -> bool {
    true
}

/// Default admission policy.
fn default_gate_policy() -> String {
    DEFAULT_GATE_POLICY.to_string()
}

/// Resolves the config path: explicit argument, then environment, then cwd.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(explicit) = path {
        return explicit.to_path_buf();
    }
    if let Ok(from_env) = env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(from_env);
    }
    PathBuf::from(DEFAULT_CONFIG_NAME)
}
