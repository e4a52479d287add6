// crates/opspipe-core/src/core/policy.rs
// ============================================================================
// Module: Policy Result Records
// Description: Immutable outcome record for one policy evaluation.
// Purpose: Provide the stable result shape returned by the policy engine.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! A [`PolicyResult`] is created once per evaluation call and never mutated.
//! The `reason` string is fixed per policy and outcome; it never embeds
//! context values, so results are safe to log without redaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Policy Result
// ============================================================================

/// Immutable outcome of one policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyResult {
    /// Whether the predicate held over the supplied context.
    pub passed: bool,
    /// Fixed reason string tied to the pass/fail outcome.
    pub reason: String,
    /// Evaluation timestamp supplied by the caller.
    pub timestamp: Timestamp,
}
