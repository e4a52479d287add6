// crates/opspipe-gateway/src/schema.rs
// ============================================================================
// Module: Schema Validation Gate
// Description: JSON Schema enforcement for inbound request bodies.
// Purpose: Reject malformed bodies with a complete violation list and strip
//          unknown top-level keys before anything downstream sees them.
// Dependencies: jsonschema, serde, serde_json
// ============================================================================

//! ## Overview
//! The gate compiles its schemas once at boot and validates every inbound
//! body before any pipeline stage runs. Validation reports all violations in
//! one pass as `{path, issue}` pairs rather than stopping at the first, so a
//! caller can fix a bad request in one round trip. Unknown top-level keys
//! are stripped, never rejected; downstream stages only ever see the keys
//! the contract names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use jsonschema::Draft;
use jsonschema::Validator;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Violations
// ============================================================================

/// One schema violation at a JSON pointer path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// JSON pointer to the offending value.
    pub path: String,
    /// Human-readable description of the violation.
    pub issue: String,
}

/// Schema gate construction errors.
#[derive(Debug, Error)]
pub enum SchemaGateError {
    /// A builtin schema failed to compile.
    #[error("schema compile error: {0}")]
    Compile(String),
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Top-level keys retained on a workflow request body.
const WORKFLOW_REQUEST_KEYS: &[&str] = &["workflowName", "payload", "idempotencyKey"];

/// Top-level keys retained on an envelope body.
const ENVELOPE_KEYS: &[&str] = &[
    "workspace_id",
    "work_item_id",
    "correlation_id",
    "organ_source",
    "organ_target",
    "policy_version",
    "timestamp",
    "payload",
];

/// Compiled validators for the gateway's request contracts.
pub struct SchemaGate {
    /// Validator for orchestration request bodies.
    workflow_request: Validator,
    /// Validator for pipe envelope bodies.
    envelope: Validator,
}

impl SchemaGate {
    /// Compiles the builtin request schemas.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaGateError::Compile`] when a builtin schema is invalid;
    /// the gateway must refuse to boot in that case.
    pub fn new() -> Result<Self, SchemaGateError> {
        Ok(Self {
            workflow_request: compile(&workflow_request_schema())?,
            envelope: compile(&envelope_schema())?,
        })
    }

    /// Sanitizes and validates a workflow request body in place.
    ///
    /// # Errors
    ///
    /// Returns every violation found, as `{path, issue}` pairs.
    pub fn check_workflow_request(&self, body: &mut Value) -> Result<(), Vec<SchemaViolation>> {
        strip_unknown_keys(body, WORKFLOW_REQUEST_KEYS);
        collect_violations(&self.workflow_request, body)
    }

    /// Sanitizes and validates an envelope body in place.
    ///
    /// # Errors
    ///
    /// Returns every violation found, as `{path, issue}` pairs.
    pub fn check_envelope(&self, body: &mut Value) -> Result<(), Vec<SchemaViolation>> {
        strip_unknown_keys(body, ENVELOPE_KEYS);
        collect_violations(&self.envelope, body)
    }
}

// ============================================================================
// SECTION: Builtin Schemas
// ============================================================================

/// Contract for orchestration request bodies.
fn workflow_request_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["workflowName", "payload"],
        "properties": {
            "workflowName": { "type": "string", "minLength": 3 },
            // Payload must be present but may be any JSON value.
            "payload": true,
            "idempotencyKey": { "type": "string", "minLength": 1 }
        }
    })
}

/// Contract for pipe envelope bodies.
fn envelope_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": [
            "workspace_id",
            "work_item_id",
            "correlation_id",
            "organ_source",
            "organ_target",
            "policy_version",
            "timestamp",
            "payload"
        ],
        "properties": {
            "workspace_id": { "type": "string", "minLength": 1 },
            "work_item_id": { "type": "string", "minLength": 1 },
            "correlation_id": { "type": "string", "minLength": 1 },
            "organ_source": { "type": "string", "minLength": 1 },
            "organ_target": { "type": "string", "minLength": 1 },
            "policy_version": { "type": "string", "minLength": 1 },
            "timestamp": { "type": "integer" },
            "payload": { "type": "object" }
        }
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Compiles a JSON schema under draft 2020-12.
fn compile(schema: &Value) -> Result<Validator, SchemaGateError> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| SchemaGateError::Compile(err.to_string()))
}

/// Removes top-level keys outside the allowlist.
fn strip_unknown_keys(body: &mut Value, allowed: &[&str]) {
    if let Value::Object(map) = body {
        map.retain(|key, _| allowed.contains(&key.as_str()));
    }
}

/// Runs a validator and collects every violation.
fn collect_violations(validator: &Validator, body: &Value) -> Result<(), Vec<SchemaViolation>> {
    let violations: Vec<SchemaViolation> = validator
        .iter_errors(body)
        .map(|err| SchemaViolation {
            path: err.instance_path().to_string(),
            issue: err.to_string(),
        })
        .collect();
    if violations.is_empty() { Ok(()) } else { Err(violations) }
}
