// crates/opspipe-config/tests/config_loading.rs
// ============================================================================
// Module: Configuration Loading Tests
// Description: Tests for TOML loading, defaults, and bounds validation.
// ============================================================================
//! ## Overview
//! Validates default values, required fields, and fail-closed bounds checks.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use std::io::Write;

use opspipe_config::ConfigError;
use opspipe_config::OpspipeConfig;
use tempfile::NamedTempFile;

/// Writes TOML content to a temp file and loads it.
fn load(content: &str) -> Result<OpspipeConfig, ConfigError> {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    OpspipeConfig::load(Some(file.path()))
}

/// Minimal valid config body.
const MINIMAL: &str = r#"
[auth]
signing_secret = "0123456789abcdef0123456789abcdef"
"#;

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn test_minimal_config_applies_defaults() {
    let config = load(MINIMAL).unwrap();
    assert_eq!(config.server.bind, "127.0.0.1:8080");
    assert_eq!(config.breaker.max_executions_per_window, 10);
    assert_eq!(config.breaker.window_ms, 60_000);
    assert_eq!(config.idempotency.ttl_seconds, 60);
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.retry.base_delay_ms, 100);
    assert!(config.retry.use_jitter);
    assert!(config.redaction.pii_fields.is_empty());
    assert_eq!(config.policy.gate_policy, "workflow_enabled");
}

#[test]
fn test_explicit_sections_override_defaults() {
    let config = load(
        r#"
[auth]
signing_secret = "0123456789abcdef0123456789abcdef"

[breaker]
max_executions_per_window = 5
window_ms = 30000

[retry]
max_retries = 1
base_delay_ms = 50
use_jitter = false

[redaction]
pii_fields = ["ssn", "email"]
"#,
    )
    .unwrap();
    assert_eq!(config.breaker.max_executions_per_window, 5);
    assert_eq!(config.breaker.window_ms, 30_000);
    assert_eq!(config.retry.max_retries, 1);
    assert!(!config.retry.use_jitter);
    assert_eq!(config.redaction.pii_fields, vec!["ssn", "email"]);
}

// ============================================================================
// SECTION: Required Fields
// ============================================================================

#[test]
fn test_missing_auth_section_is_rejected() {
    let err = load("[server]\nbind = \"127.0.0.1:9000\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_empty_secret_is_rejected() {
    let err = load("[auth]\nsigning_secret = \"\"\n").unwrap_err();
    assert!(err.to_string().contains("signing_secret"));
}

#[test]
fn test_short_secret_is_rejected() {
    let err = load("[auth]\nsigning_secret = \"short\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

// ============================================================================
// SECTION: Bounds
// ============================================================================

#[test]
fn test_zero_breaker_budget_is_rejected() {
    let body = format!("{MINIMAL}\n[breaker]\nmax_executions_per_window = 0\n");
    let err = load(&body).unwrap_err();
    assert!(err.to_string().contains("max_executions_per_window"));
}

#[test]
fn test_breaker_window_out_of_range_is_rejected() {
    let body = format!("{MINIMAL}\n[breaker]\nwindow_ms = 10\n");
    assert!(load(&body).is_err());
    let body = format!("{MINIMAL}\n[breaker]\nwindow_ms = 7200000\n");
    assert!(load(&body).is_err());
}

#[test]
fn test_zero_idempotency_ttl_is_rejected() {
    let body = format!("{MINIMAL}\n[idempotency]\nttl_seconds = 0\n");
    assert!(load(&body).is_err());
}

#[test]
fn test_excessive_retries_are_rejected() {
    let body = format!("{MINIMAL}\n[retry]\nmax_retries = 50\n");
    assert!(load(&body).is_err());
}

#[test]
fn test_missing_file_reports_io_error() {
    let err = OpspipeConfig::load(Some(std::path::Path::new("/nonexistent/opspipe.toml")))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
