// crates/opspipe-core/src/core/trace.rs
// ============================================================================
// Module: Execution Trace Records
// Description: Immutable trace and effect records produced by the engine.
// Purpose: Record what a workflow implied (shadow) or did (live).
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! An [`ExecutionTrace`] is built in one shot by the execution engine and is
//! append-only once stored: its mode is fixed forever at creation, so a
//! shadow trace can never later acquire live effects. Effects are pure
//! outputs and are not persisted independently of their trace.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::TargetSystem;
use crate::core::identifiers::TraceId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Modes and Statuses
// ============================================================================

/// Execution mode, fixed at trace creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    /// Effects are computed and recorded, never dispatched.
    Shadow,
    /// Effects are computed and dispatched.
    Live,
}

/// Aggregate outcome of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Shadow run completed; no external effect occurred.
    SimulatedSuccess,
    /// Live run completed and every effect dispatched successfully.
    ExecutedSuccess,
    /// Live run completed but at least one effect failed to dispatch.
    Halted,
}

// ============================================================================
// SECTION: Effects
// ============================================================================

/// Deterministically computed side effect of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedEffect {
    /// Downstream system the effect targets.
    pub target: TargetSystem,
    /// Action the target system is asked to perform.
    pub action: String,
    /// Payload projected for the target system.
    pub payload_drop: Value,
}

// ============================================================================
// SECTION: Trace
// ============================================================================

/// Immutable record of one workflow execution.
///
/// # Invariants
/// - `mode` is fixed at creation; a `Shadow` trace never carries `Live` effects.
/// - `status` never claims success when any effect failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTrace {
    /// Trace identifier.
    pub trace_id: TraceId,
    /// Execution mode.
    pub mode: ExecutionMode,
    /// Aggregate outcome.
    pub status: ExecutionStatus,
    /// Effects computed for the workflow, in rule order.
    pub effects: Vec<ComputedEffect>,
    /// Time the trace was recorded.
    pub timestamp: Timestamp,
}
