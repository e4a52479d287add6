// crates/opspipe-core/src/runtime/redact.rs
// ============================================================================
// Module: PII Redaction
// Description: Recursive field-name redaction for audit payloads.
// Purpose: Keep configured PII values out of logs without touching results.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Redaction operates only on values destined for audit logs; it never alters
//! a value returned to a caller. Field names match case-insensitively and
//! exactly, recursively through nested objects and element-wise through
//! arrays. Matched values are replaced with a fixed marker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed marker substituted for redacted values.
pub const REDACTED_MARKER: &str = "[REDACTED]";

// ============================================================================
// SECTION: Redactor
// ============================================================================

/// Redacts configured PII field names from JSON values.
#[derive(Debug, Clone)]
pub struct Redactor {
    /// Lowercased field names to redact.
    fields: Vec<String>,
}

impl Redactor {
    /// Creates a redactor for the given field names (matched case-insensitively).
    #[must_use]
    pub fn new(fields: &[String]) -> Self {
        Self {
            fields: fields.iter().map(|field| field.to_lowercase()).collect(),
        }
    }

    /// Returns a copy of the value with configured field values replaced.
    #[must_use]
    pub fn redact(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.redact_object(map)),
            Value::Array(items) => Value::Array(items.iter().map(|item| self.redact(item)).collect()),
            other => other.clone(),
        }
    }

    /// Redacts one object, replacing matched keys and recursing into the rest.
    fn redact_object(&self, map: &Map<String, Value>) -> Map<String, Value> {
        let mut redacted = Map::with_capacity(map.len());
        for (key, value) in map {
            if self.matches(key) {
                redacted.insert(key.clone(), Value::String(REDACTED_MARKER.to_string()));
            } else {
                redacted.insert(key.clone(), self.redact(value));
            }
        }
        redacted
    }

    /// Returns true when a key matches a configured field name.
    fn matches(&self, key: &str) -> bool {
        let lowered = key.to_lowercase();
        self.fields.iter().any(|field| *field == lowered)
    }
}
