// crates/opspipe-core/src/core/mod.rs
// ============================================================================
// Module: OpsPipe Core Types
// Description: Canonical domain types shared across OpsPipe components.
// Purpose: Group identifiers, envelope, workflow, trace, and policy records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The core module holds the pure domain model: opaque identifiers, the pipe
//! envelope contract, the workflow state machine, and the immutable trace and
//! policy records. Nothing here performs I/O or reads wall-clock time.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod envelope;
pub mod identifiers;
pub mod policy;
pub mod time;
pub mod trace;
pub mod workflow;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use envelope::PipeEnvelope;
pub use identifiers::CorrelationId;
pub use identifiers::OperatorId;
pub use identifiers::OrganId;
pub use identifiers::PolicyId;
pub use identifiers::PolicyVersion;
pub use identifiers::TargetSystem;
pub use identifiers::TenantId;
pub use identifiers::TraceId;
pub use identifiers::WorkItemId;
pub use identifiers::WorkspaceId;
pub use policy::PolicyResult;
pub use time::Timestamp;
pub use trace::ComputedEffect;
pub use trace::ExecutionMode;
pub use trace::ExecutionStatus;
pub use trace::ExecutionTrace;
pub use workflow::TransitionContext;
pub use workflow::TransitionError;
pub use workflow::WorkItem;
pub use workflow::WorkItemState;
pub use workflow::transition;
