// crates/opspipe-core/src/interfaces/mod.rs
// ============================================================================
// Module: OpsPipe Interfaces
// Description: Backend-agnostic interfaces for dispatch, locks, traces, and DLQ.
// Purpose: Define the contract surfaces used by the OpsPipe runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how OpsPipe integrates with external systems without
//! embedding backend-specific details. Every capability is injected at
//! construction time; the runtime never loads a backend dynamically.
//! Implementations must be deterministic and fail closed on missing or
//! invalid data. Callers cannot observe whether a store is backed by a
//! single-process map or a shared external service.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::ComputedEffect;
use crate::core::ExecutionTrace;
use crate::core::TargetSystem;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Receipt returned by a dispatcher for one delivered effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    /// Target system that accepted the effect.
    pub target: TargetSystem,
    /// Backend-specific delivery reference.
    pub reference: Option<String>,
}

/// Dispatch errors for effect delivery.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Dispatcher reported a delivery failure.
    #[error("dispatch error: {0}")]
    DispatchFailed(String),
}

/// Effect dispatcher responsible for delivering side effects downstream.
pub trait Dispatcher: Send + Sync {
    /// Dispatches a computed effect to its target system.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when delivery fails.
    fn dispatch(&self, effect: &ComputedEffect) -> Result<DispatchReceipt, DispatchError>;
}

// ============================================================================
// SECTION: Lock Store
// ============================================================================

/// Lock store errors.
#[derive(Debug, Error)]
pub enum LockStoreError {
    /// Store I/O or lock-poisoning error.
    #[error("lock store error: {0}")]
    Store(String),
}

/// Keyed expiry store backing the idempotency guard.
///
/// The interface is a minimal get/set/delete plus an expiry sweep so a shared
/// external store can replace the in-memory default without changing call
/// sites.
pub trait LockStore: Send + Sync {
    /// Returns the expiry recorded for a key, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LockStoreError`] when the lookup fails.
    fn get(&self, key: &str) -> Result<Option<Timestamp>, LockStoreError>;

    /// Records an expiry for a key, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`LockStoreError`] when the write fails.
    fn set(&self, key: &str, expiry: Timestamp) -> Result<(), LockStoreError>;

    /// Removes the entry for a key.
    ///
    /// # Errors
    ///
    /// Returns [`LockStoreError`] when the delete fails.
    fn delete(&self, key: &str) -> Result<(), LockStoreError>;

    /// Removes every entry whose expiry is at or before `now` and returns how
    /// many were dropped.
    ///
    /// # Errors
    ///
    /// Returns [`LockStoreError`] when the sweep fails.
    fn prune_expired(&self, now: Timestamp) -> Result<usize, LockStoreError>;
}

// ============================================================================
// SECTION: Trace Store
// ============================================================================

/// Trace store errors.
#[derive(Debug, Error)]
pub enum TraceStoreError {
    /// Store I/O or lock-poisoning error.
    #[error("trace store error: {0}")]
    Store(String),
}

/// Append-only store for execution traces.
pub trait TraceStore: Send + Sync {
    /// Appends a trace. Traces are immutable once appended.
    ///
    /// # Errors
    ///
    /// Returns [`TraceStoreError`] when the append fails.
    fn append(&self, trace: &ExecutionTrace) -> Result<(), TraceStoreError>;

    /// Returns the most recent traces, newest first, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceStoreError`] when the read fails.
    fn recent(&self, limit: usize) -> Result<Vec<ExecutionTrace>, TraceStoreError>;
}

// ============================================================================
// SECTION: Dead Letter Queue
// ============================================================================

/// Record of a payload whose processing permanently failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlqRecord {
    /// Original payload that could not be processed.
    pub payload: Value,
    /// Terminal error reason.
    pub reason: String,
    /// Time the record was appended.
    pub timestamp: Timestamp,
}

/// DLQ store errors.
#[derive(Debug, Error)]
pub enum DlqError {
    /// Store I/O or lock-poisoning error.
    #[error("dlq error: {0}")]
    Store(String),
}

/// Append-only dead letter queue.
pub trait DlqStore: Send + Sync {
    /// Appends a record. Terminal failures are recorded, never dropped.
    ///
    /// # Errors
    ///
    /// Returns [`DlqError`] when the append fails.
    fn push(&self, record: DlqRecord) -> Result<(), DlqError>;

    /// Returns every record in append order.
    ///
    /// # Errors
    ///
    /// Returns [`DlqError`] when the read fails.
    fn fetch(&self) -> Result<Vec<DlqRecord>, DlqError>;

    /// Removes every record. Exists strictly for test/ops reset.
    ///
    /// # Errors
    ///
    /// Returns [`DlqError`] when the reset fails.
    fn clear(&self) -> Result<(), DlqError>;
}
