// crates/opspipe-core/tests/policy_and_redaction.rs
// ============================================================================
// Module: Policy and Redaction Tests
// Description: Tests for policy evaluation, log redaction, and tenant guard.
// ============================================================================
//! ## Overview
//! Validates deterministic policy outcomes, missing-policy failures, field
//! masking, and workspace isolation enforcement.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use opspipe_core::CorrelationId;
use opspipe_core::OrganId;
use opspipe_core::PipeEnvelope;
use opspipe_core::PolicyEngine;
use opspipe_core::PolicyEvalError;
use opspipe_core::PolicyId;
use opspipe_core::PolicyVersion;
use opspipe_core::REDACTED_MARKER;
use opspipe_core::Redactor;
use opspipe_core::TenantViolation;
use opspipe_core::Timestamp;
use opspipe_core::WorkItemId;
use opspipe_core::WorkspaceId;
use opspipe_core::enforce_workspace;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

/// Evaluation timestamp shared across tests.
fn now() -> Timestamp {
    Timestamp::from_unix_millis(1_700_000_000_000)
}

/// Builds a context map from a JSON object literal.
fn context(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

// ============================================================================
// SECTION: Policy Evaluation
// ============================================================================

#[test]
fn test_workflow_enabled_passes_with_named_workflow() {
    let engine = PolicyEngine::with_builtins();
    let result = engine
        .evaluate(
            &PolicyId::new("workflow_enabled"),
            &context(json!({"workflowName": "SendWeeklyReport"})),
            now(),
        )
        .unwrap();
    assert!(result.passed);
    assert_eq!(result.timestamp, now());
}

#[test]
fn test_workflow_enabled_fails_on_short_name() {
    let engine = PolicyEngine::with_builtins();
    let result = engine
        .evaluate(
            &PolicyId::new("workflow_enabled"),
            &context(json!({"workflowName": "ab"})),
            now(),
        )
        .unwrap();
    assert!(!result.passed);
    assert_eq!(result.reason, "workflow name missing or too short");
}

#[test]
fn test_tenant_active_requires_nonempty_tenant() {
    let engine = PolicyEngine::with_builtins();
    let pass = engine
        .evaluate(&PolicyId::new("tenant_active"), &context(json!({"tenantId": "t-1"})), now())
        .unwrap();
    assert!(pass.passed);
    let fail = engine
        .evaluate(&PolicyId::new("tenant_active"), &context(json!({"tenantId": ""})), now())
        .unwrap();
    assert!(!fail.passed);
}

#[test]
fn test_business_hours_boundaries() {
    let engine = PolicyEngine::with_builtins();
    let id = PolicyId::new("business_hours");
    assert!(engine.evaluate(&id, &context(json!({"hour": 8})), now()).unwrap().passed);
    assert!(engine.evaluate(&id, &context(json!({"hour": 19})), now()).unwrap().passed);
    assert!(!engine.evaluate(&id, &context(json!({"hour": 20})), now()).unwrap().passed);
    assert!(!engine.evaluate(&id, &context(json!({"hour": 3})), now()).unwrap().passed);
}

#[test]
fn test_unknown_policy_is_a_hard_error() {
    let engine = PolicyEngine::with_builtins();
    let err = engine
        .evaluate(&PolicyId::new("no_such_policy"), &Map::new(), now())
        .unwrap_err();
    assert_eq!(err, PolicyEvalError::PolicyNotFound("no_such_policy".to_string()));
}

#[test]
fn test_evaluation_is_deterministic() {
    let engine = PolicyEngine::with_builtins();
    let ctx = context(json!({"workflowName": "SendWeeklyReport"}));
    let first = engine.evaluate(&PolicyId::new("workflow_enabled"), &ctx, now()).unwrap();
    let second = engine.evaluate(&PolicyId::new("workflow_enabled"), &ctx, now()).unwrap();
    assert_eq!(first.passed, second.passed);
    assert_eq!(first.reason, second.reason);
}

// ============================================================================
// SECTION: Redaction
// ============================================================================

#[test]
fn test_redactor_masks_configured_fields_recursively() {
    let redactor = Redactor::new(&["ssn".to_string(), "email".to_string()]);
    let input = json!({
        "name": "resident",
        "ssn": "123-45-6789",
        "contact": { "Email": "resident@example.com", "phone": "555-0100" },
        "history": [ { "ssn": "987-65-4321" } ],
    });
    let redacted = redactor.redact(&input);
    assert_eq!(redacted["ssn"], json!(REDACTED_MARKER));
    assert_eq!(redacted["contact"]["Email"], json!(REDACTED_MARKER));
    assert_eq!(redacted["history"][0]["ssn"], json!(REDACTED_MARKER));
    assert_eq!(redacted["name"], json!("resident"));
    assert_eq!(redacted["contact"]["phone"], json!("555-0100"));
}

#[test]
fn test_redactor_leaves_input_untouched() {
    let redactor = Redactor::new(&["ssn".to_string()]);
    let input = json!({"ssn": "123-45-6789"});
    let _ = redactor.redact(&input);
    assert_eq!(input["ssn"], json!("123-45-6789"));
}

// ============================================================================
// SECTION: Tenant Guard
// ============================================================================

/// Builds an envelope bound to the given workspace.
fn envelope(workspace: &str) -> PipeEnvelope {
    PipeEnvelope {
        workspace_id: WorkspaceId::new(workspace),
        work_item_id: WorkItemId::new("wi-1"),
        correlation_id: CorrelationId::new("corr-1"),
        organ_source: OrganId::new("intake"),
        organ_target: OrganId::new("executor"),
        policy_version: PolicyVersion::new("v1"),
        timestamp: now(),
        payload: json!({}),
    }
}

#[test]
fn test_matching_workspace_is_allowed() {
    let active = WorkspaceId::new("ws-1");
    enforce_workspace(&envelope("ws-1"), &active).unwrap();
}

#[test]
fn test_foreign_workspace_is_rejected() {
    let active = WorkspaceId::new("ws-1");
    let err = enforce_workspace(&envelope("ws-2"), &active).unwrap_err();
    assert!(matches!(err, TenantViolation::WorkspaceMismatch { .. }));
}
