// crates/opspipe-core/src/runtime/mod.rs
// ============================================================================
// Module: OpsPipe Core Runtime
// Description: Execution services built over the core domain model.
// Purpose: Group the engine, breaker, idempotency, retry, policy, tenant,
//          redaction, and store implementations.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime layer implements the execution services behind the interface
//! traits: in-memory stores, the policy engine, the circuit breaker, the
//! idempotency guard, retry scheduling, tenant enforcement, redaction, and
//! the execution engine that ties them together.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod breaker;
pub mod engine;
pub mod idempotency;
pub mod policy;
pub mod redact;
pub mod retry;
pub mod store;
pub mod tenant;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use breaker::BreakerError;
pub use breaker::CircuitBreaker;
pub use engine::EffectRule;
pub use engine::EffectTemplate;
pub use engine::EngineError;
pub use engine::ExecutionEngine;
pub use engine::builtin_effect_rules;
pub use idempotency::IdempotencyGuard;
pub use policy::PolicyDefinition;
pub use policy::PolicyEngine;
pub use policy::PolicyEvalError;
pub use policy::PolicyPredicate;
pub use redact::REDACTED_MARKER;
pub use redact::Redactor;
pub use retry::RetryPolicy;
pub use retry::with_retry;
pub use store::InMemoryDlq;
pub use store::InMemoryLockStore;
pub use store::InMemoryTraceStore;
pub use store::SharedDlqStore;
pub use store::SharedLockStore;
pub use store::SharedTraceStore;
pub use tenant::TenantViolation;
pub use tenant::enforce_workspace;
