// crates/opspipe-core/src/core/envelope.rs
// ============================================================================
// Module: OpsPipe Envelope Contract
// Description: Canonical message envelope exchanged between OpsPipe organs.
// Purpose: Provide the single shared message shape for cross-component flow.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Components communicate exclusively through [`PipeEnvelope`] values. The
//! envelope carries workspace and correlation identifiers alongside an opaque
//! payload; its `workspace_id` must match the active execution context, which
//! the tenant isolation guard enforces before any payload is interpreted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::OrganId;
use crate::core::identifiers::PolicyVersion;
use crate::core::identifiers::WorkItemId;
use crate::core::identifiers::WorkspaceId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Canonical message envelope carrying a payload between OpsPipe organs.
///
/// # Invariants
/// - `workspace_id` must equal the active execution context; a mismatch is a
///   security violation, never a routing decision.
/// - The payload is opaque to routing; only the receiving organ interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeEnvelope {
    /// Workspace the envelope belongs to.
    pub workspace_id: WorkspaceId,
    /// Work item the envelope drives.
    pub work_item_id: WorkItemId,
    /// Correlation identifier linking related records.
    pub correlation_id: CorrelationId,
    /// Organ that emitted the envelope.
    pub organ_source: OrganId,
    /// Organ the envelope is addressed to.
    pub organ_target: OrganId,
    /// Policy version active when the envelope was emitted.
    pub policy_version: PolicyVersion,
    /// Emission timestamp supplied by the sender.
    pub timestamp: Timestamp,
    /// Opaque payload interpreted only by the target organ.
    pub payload: Value,
}
