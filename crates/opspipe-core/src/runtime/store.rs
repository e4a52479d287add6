// crates/opspipe-core/src/runtime/store.rs
// ============================================================================
// Module: OpsPipe In-Memory Stores
// Description: In-memory lock, trace, and DLQ stores plus shared wrappers.
// Purpose: Provide deterministic store implementations without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides in-memory implementations of [`LockStore`],
//! [`TraceStore`], and [`DlqStore`] for single-process deployments and tests,
//! plus `Shared*` wrappers so the concrete backend can be swapped at boot
//! without changing call sites.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::ExecutionTrace;
use crate::core::Timestamp;
use crate::interfaces::DlqError;
use crate::interfaces::DlqRecord;
use crate::interfaces::DlqStore;
use crate::interfaces::LockStore;
use crate::interfaces::LockStoreError;
use crate::interfaces::TraceStore;
use crate::interfaces::TraceStoreError;

// ============================================================================
// SECTION: In-Memory Lock Store
// ============================================================================

/// In-memory keyed expiry store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLockStore {
    /// Expiry map protected by a mutex.
    entries: Arc<Mutex<BTreeMap<String, Timestamp>>>,
}

impl InMemoryLockStore {
    /// Creates a new in-memory lock store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl LockStore for InMemoryLockStore {
    fn get(&self, key: &str) -> Result<Option<Timestamp>, LockStoreError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| LockStoreError::Store("lock store mutex poisoned".to_string()))?;
        Ok(guard.get(key).copied())
    }

    fn set(&self, key: &str, expiry: Timestamp) -> Result<(), LockStoreError> {
        self.entries
            .lock()
            .map_err(|_| LockStoreError::Store("lock store mutex poisoned".to_string()))?
            .insert(key.to_string(), expiry);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), LockStoreError> {
        self.entries
            .lock()
            .map_err(|_| LockStoreError::Store("lock store mutex poisoned".to_string()))?
            .remove(key);
        Ok(())
    }

    fn prune_expired(&self, now: Timestamp) -> Result<usize, LockStoreError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| LockStoreError::Store("lock store mutex poisoned".to_string()))?;
        let before = guard.len();
        guard.retain(|_, expiry| now.is_before(*expiry));
        Ok(before - guard.len())
    }
}

// ============================================================================
// SECTION: In-Memory Trace Store
// ============================================================================

/// In-memory append-only trace store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTraceStore {
    /// Trace list in append order, protected by a mutex.
    traces: Arc<Mutex<Vec<ExecutionTrace>>>,
}

impl InMemoryTraceStore {
    /// Creates a new in-memory trace store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            traces: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl TraceStore for InMemoryTraceStore {
    fn append(&self, trace: &ExecutionTrace) -> Result<(), TraceStoreError> {
        self.traces
            .lock()
            .map_err(|_| TraceStoreError::Store("trace store mutex poisoned".to_string()))?
            .push(trace.clone());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<ExecutionTrace>, TraceStoreError> {
        let guard = self
            .traces
            .lock()
            .map_err(|_| TraceStoreError::Store("trace store mutex poisoned".to_string()))?;
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

// ============================================================================
// SECTION: In-Memory DLQ
// ============================================================================

/// In-memory append-only dead letter queue.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDlq {
    /// Record list in append order, protected by a mutex.
    records: Arc<Mutex<Vec<DlqRecord>>>,
}

impl InMemoryDlq {
    /// Creates a new in-memory DLQ.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl DlqStore for InMemoryDlq {
    fn push(&self, record: DlqRecord) -> Result<(), DlqError> {
        self.records
            .lock()
            .map_err(|_| DlqError::Store("dlq mutex poisoned".to_string()))?
            .push(record);
        Ok(())
    }

    fn fetch(&self) -> Result<Vec<DlqRecord>, DlqError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| DlqError::Store("dlq mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn clear(&self) -> Result<(), DlqError> {
        self.records.lock().map_err(|_| DlqError::Store("dlq mutex poisoned".to_string()))?.clear();
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Store Wrappers
// ============================================================================

/// Shared lock store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedLockStore {
    /// Inner store implementation.
    inner: Arc<dyn LockStore>,
}

impl SharedLockStore {
    /// Wraps a lock store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl LockStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }
}

impl LockStore for SharedLockStore {
    fn get(&self, key: &str) -> Result<Option<Timestamp>, LockStoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, expiry: Timestamp) -> Result<(), LockStoreError> {
        self.inner.set(key, expiry)
    }

    fn delete(&self, key: &str) -> Result<(), LockStoreError> {
        self.inner.delete(key)
    }

    fn prune_expired(&self, now: Timestamp) -> Result<usize, LockStoreError> {
        self.inner.prune_expired(now)
    }
}

/// Shared trace store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedTraceStore {
    /// Inner store implementation.
    inner: Arc<dyn TraceStore>,
}

impl SharedTraceStore {
    /// Wraps a trace store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl TraceStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }
}

impl TraceStore for SharedTraceStore {
    fn append(&self, trace: &ExecutionTrace) -> Result<(), TraceStoreError> {
        self.inner.append(trace)
    }

    fn recent(&self, limit: usize) -> Result<Vec<ExecutionTrace>, TraceStoreError> {
        self.inner.recent(limit)
    }
}

/// Shared DLQ backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedDlqStore {
    /// Inner store implementation.
    inner: Arc<dyn DlqStore>,
}

impl SharedDlqStore {
    /// Wraps a DLQ store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl DlqStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }
}

impl DlqStore for SharedDlqStore {
    fn push(&self, record: DlqRecord) -> Result<(), DlqError> {
        self.inner.push(record)
    }

    fn fetch(&self) -> Result<Vec<DlqRecord>, DlqError> {
        self.inner.fetch()
    }

    fn clear(&self) -> Result<(), DlqError> {
        self.inner.clear()
    }
}
