// crates/opspipe-gateway/src/audit.rs
// ============================================================================
// Module: Gateway Audit
// Description: Structured audit events for security-relevant decisions.
// Purpose: Emit JSON-line audit records for auth, tenant, policy, breaker,
//          and dead-letter events.
// Dependencies: opspipe-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are serialized as single JSON lines. The stderr sink is the
//! production default; the no-op sink exists for tests. Policy evaluation
//! events carry the evaluation context, which callers must redact before
//! constructing the event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::auth::AuthContext;
use crate::auth::AuthError;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Gateway audit event payload.
#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Decision outcome.
    decision: &'static str,
    /// Route or stage the event refers to.
    stage: String,
    /// Caller subject when authenticated.
    subject: Option<String>,
    /// Caller role label when authenticated.
    role: Option<&'static str>,
    /// Bearer token fingerprint (sha256).
    token_fingerprint: Option<String>,
    /// Failure reason for deny events.
    reason: Option<String>,
    /// Redacted evaluation context for policy events.
    context: Option<Value>,
}

impl AuditEvent {
    /// Builds an auth allow event.
    #[must_use]
    pub fn auth_allowed(stage: &str, auth: &AuthContext) -> Self {
        Self {
            event: "gateway_auth",
            decision: "allow",
            stage: stage.to_string(),
            subject: Some(auth.operator_id.as_str().to_string()),
            role: Some(auth.role.label()),
            token_fingerprint: Some(auth.token_fingerprint.clone()),
            reason: None,
            context: None,
        }
    }

    /// Builds an auth deny event.
    #[must_use]
    pub fn auth_denied(stage: &str, error: &AuthError) -> Self {
        Self {
            event: "gateway_auth",
            decision: "deny",
            stage: stage.to_string(),
            subject: None,
            role: None,
            token_fingerprint: None,
            reason: Some(error.to_string()),
            context: None,
        }
    }

    /// Builds a tenant isolation violation event.
    #[must_use]
    pub fn tenant_violation(stage: &str, auth: &AuthContext, reason: &str) -> Self {
        Self {
            event: "tenant_isolation",
            decision: "deny",
            stage: stage.to_string(),
            subject: Some(auth.operator_id.as_str().to_string()),
            role: Some(auth.role.label()),
            token_fingerprint: Some(auth.token_fingerprint.clone()),
            reason: Some(reason.to_string()),
            context: None,
        }
    }

    /// Builds a policy evaluation event over an already-redacted context.
    #[must_use]
    pub fn policy_evaluated(stage: &str, passed: bool, reason: &str, redacted: Value) -> Self {
        Self {
            event: "policy_evaluation",
            decision: if passed { "allow" } else { "deny" },
            stage: stage.to_string(),
            subject: None,
            role: None,
            token_fingerprint: None,
            reason: Some(reason.to_string()),
            context: Some(redacted),
        }
    }

    /// Builds a circuit breaker trip event.
    #[must_use]
    pub fn circuit_tripped(stage: &str, reason: &str) -> Self {
        Self {
            event: "circuit_breaker",
            decision: "deny",
            stage: stage.to_string(),
            subject: None,
            role: None,
            token_fingerprint: None,
            reason: Some(reason.to_string()),
            context: None,
        }
    }

    /// Builds an internal store failure event.
    #[must_use]
    pub fn store_failure(stage: &str, reason: &str) -> Self {
        Self {
            event: "store_failure",
            decision: "deny",
            stage: stage.to_string(),
            subject: None,
            role: None,
            token_fingerprint: None,
            reason: Some(reason.to_string()),
            context: None,
        }
    }

    /// Builds a dead-letter append event.
    #[must_use]
    pub fn dead_letter(stage: &str, reason: &str) -> Self {
        Self {
            event: "dead_letter",
            decision: "deny",
            stage: stage.to_string(),
            subject: None,
            role: None,
            token_fingerprint: None,
            reason: Some(reason.to_string()),
            context: None,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for gateway decisions.
pub trait AuditSink: Send + Sync {
    /// Records one audit event.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}
