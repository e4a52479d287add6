// crates/opspipe-core/src/runtime/policy.rs
// ============================================================================
// Module: Policy Evaluation Engine
// Description: Registry of named pure predicates over a context map.
// Purpose: Provide deterministic, fail-closed admission decisions.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! A policy is a named pure predicate over a JSON context map. Evaluation is
//! deterministic: identical `(policy_id, context)` inputs always yield the
//! same `passed` outcome, and the reason string is fixed per policy and
//! outcome. An unregistered identifier is a configuration fault surfaced as
//! [`PolicyEvalError::PolicyNotFound`], never retried. Redaction of contexts
//! for audit logging is the caller's responsibility via
//! [`crate::runtime::redact::Redactor`]; the returned [`PolicyResult`] is
//! never redacted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::PolicyId;
use crate::core::PolicyResult;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Policy Definitions
// ============================================================================

/// Pure predicate evaluated over a context map.
pub type PolicyPredicate = Arc<dyn Fn(&Map<String, Value>) -> bool + Send + Sync>;

/// A registered policy: predicate plus fixed outcome reasons.
#[derive(Clone)]
pub struct PolicyDefinition {
    /// Predicate deciding the outcome.
    predicate: PolicyPredicate,
    /// Reason reported when the predicate holds.
    pass_reason: &'static str,
    /// Reason reported when the predicate does not hold.
    fail_reason: &'static str,
}

impl PolicyDefinition {
    /// Creates a policy definition.
    #[must_use]
    pub fn new(
        predicate: PolicyPredicate,
        pass_reason: &'static str,
        fail_reason: &'static str,
    ) -> Self {
        Self {
            predicate,
            pass_reason,
            fail_reason,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy evaluation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyEvalError {
    /// No policy is registered under the requested identifier.
    #[error("policy not found: {0}")]
    PolicyNotFound(String),
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Registry-backed policy evaluation engine.
#[derive(Clone, Default)]
pub struct PolicyEngine {
    /// Registered policies keyed by identifier.
    policies: BTreeMap<PolicyId, PolicyDefinition>,
}

impl PolicyEngine {
    /// Creates an empty policy engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: BTreeMap::new(),
        }
    }

    /// Creates an engine with the builtin admission policies registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut engine = Self::new();
        engine.register(
            PolicyId::new("workflow_enabled"),
            PolicyDefinition::new(
                Arc::new(|context| {
                    context
                        .get("workflowName")
                        .and_then(Value::as_str)
                        .is_some_and(|name| name.len() >= 3)
                }),
                "workflow name present",
                "workflow name missing or too short",
            ),
        );
        engine.register(
            PolicyId::new("tenant_active"),
            PolicyDefinition::new(
                Arc::new(|context| {
                    context
                        .get("tenantId")
                        .and_then(Value::as_str)
                        .is_some_and(|tenant| !tenant.is_empty())
                }),
                "tenant active",
                "tenant missing or inactive",
            ),
        );
        engine.register(
            PolicyId::new("business_hours"),
            PolicyDefinition::new(
                Arc::new(|context| {
                    context
                        .get("hour")
                        .and_then(Value::as_u64)
                        .is_some_and(|hour| (8..20).contains(&hour))
                }),
                "within business hours",
                "outside business hours",
            ),
        );
        engine
    }

    /// Registers a policy, replacing any previous definition for the id.
    pub fn register(&mut self, id: PolicyId, definition: PolicyDefinition) {
        self.policies.insert(id, definition);
    }

    /// Returns true when a policy is registered under the identifier.
    #[must_use]
    pub fn contains(&self, id: &PolicyId) -> bool {
        self.policies.contains_key(id)
    }

    /// Evaluates a policy over a context map.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyEvalError::PolicyNotFound`] for an unregistered id.
    pub fn evaluate(
        &self,
        id: &PolicyId,
        context: &Map<String, Value>,
        now: Timestamp,
    ) -> Result<PolicyResult, PolicyEvalError> {
        let definition = self
            .policies
            .get(id)
            .ok_or_else(|| PolicyEvalError::PolicyNotFound(id.to_string()))?;
        let passed = (definition.predicate)(context);
        let reason = if passed { definition.pass_reason } else { definition.fail_reason };
        Ok(PolicyResult {
            passed,
            reason: reason.to_string(),
            timestamp: now,
        })
    }
}
