// crates/opspipe-core/src/lib.rs
// ============================================================================
// Module: OpsPipe Core
// Description: Deterministic execution spine for operational workflows.
// Purpose: Expose the domain model, interface traits, and runtime services.
// Dependencies: serde, serde_json, thiserror, rand, uuid
// ============================================================================

//! ## Overview
//! `opspipe-core` turns an authenticated workflow request into either a
//! simulated trace (shadow) or a dispatched set of side effects (live). The
//! crate is split into three layers: `core` holds the pure domain model,
//! `interfaces` defines the pluggable boundaries (dispatch, locks, traces,
//! dead letters), and `runtime` implements the execution services over them.
//! The crate never reads wall-clock time; callers pass timestamps in.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::ComputedEffect;
pub use self::core::CorrelationId;
pub use self::core::ExecutionMode;
pub use self::core::ExecutionStatus;
pub use self::core::ExecutionTrace;
pub use self::core::OperatorId;
pub use self::core::OrganId;
pub use self::core::PipeEnvelope;
pub use self::core::PolicyId;
pub use self::core::PolicyResult;
pub use self::core::PolicyVersion;
pub use self::core::TargetSystem;
pub use self::core::TenantId;
pub use self::core::Timestamp;
pub use self::core::TraceId;
pub use self::core::TransitionContext;
pub use self::core::TransitionError;
pub use self::core::WorkItem;
pub use self::core::WorkItemId;
pub use self::core::WorkItemState;
pub use self::core::WorkspaceId;
pub use self::core::transition;
pub use interfaces::DispatchError;
pub use interfaces::DispatchReceipt;
pub use interfaces::Dispatcher;
pub use interfaces::DlqError;
pub use interfaces::DlqRecord;
pub use interfaces::DlqStore;
pub use interfaces::LockStore;
pub use interfaces::LockStoreError;
pub use interfaces::TraceStore;
pub use interfaces::TraceStoreError;
pub use runtime::BreakerError;
pub use runtime::CircuitBreaker;
pub use runtime::EffectRule;
pub use runtime::EffectTemplate;
pub use runtime::EngineError;
pub use runtime::ExecutionEngine;
pub use runtime::IdempotencyGuard;
pub use runtime::InMemoryDlq;
pub use runtime::InMemoryLockStore;
pub use runtime::InMemoryTraceStore;
pub use runtime::PolicyDefinition;
pub use runtime::PolicyEngine;
pub use runtime::PolicyEvalError;
pub use runtime::REDACTED_MARKER;
pub use runtime::Redactor;
pub use runtime::RetryPolicy;
pub use runtime::SharedDlqStore;
pub use runtime::SharedLockStore;
pub use runtime::SharedTraceStore;
pub use runtime::TenantViolation;
pub use runtime::builtin_effect_rules;
pub use runtime::enforce_workspace;
pub use runtime::with_retry;
