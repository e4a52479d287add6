// crates/opspipe-core/src/runtime/tenant.rs
// ============================================================================
// Module: Tenant Isolation Guard
// Description: Workspace identity check for inbound pipe envelopes.
// Purpose: Reject cross-workspace messages before any payload is interpreted.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The tenant isolation guard is a pure predicate over an envelope and the
//! active workspace. A mismatch is a security violation: callers must surface
//! it and record a security-critical audit event, never drop it silently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::PipeEnvelope;
use crate::core::WorkspaceId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tenant isolation violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TenantViolation {
    /// Envelope workspace does not match the active execution context.
    #[error("workspace mismatch: envelope={envelope} active={active}")]
    WorkspaceMismatch {
        /// Workspace claimed by the envelope.
        envelope: String,
        /// Workspace of the active execution context.
        active: String,
    },
    /// Envelope workspace identifier is empty.
    #[error("envelope workspace identifier is empty")]
    MissingWorkspace,
}

// ============================================================================
// SECTION: Guard
// ============================================================================

/// Validates that an envelope belongs to the active workspace.
///
/// # Errors
///
/// Returns [`TenantViolation`] when the workspace identifier is empty or
/// differs from the active context.
pub fn enforce_workspace(
    envelope: &PipeEnvelope,
    active: &WorkspaceId,
) -> Result<(), TenantViolation> {
    if envelope.workspace_id.as_str().is_empty() {
        return Err(TenantViolation::MissingWorkspace);
    }
    if envelope.workspace_id != *active {
        return Err(TenantViolation::WorkspaceMismatch {
            envelope: envelope.workspace_id.to_string(),
            active: active.to_string(),
        });
    }
    Ok(())
}
