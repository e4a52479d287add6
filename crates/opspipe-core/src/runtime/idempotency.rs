// crates/opspipe-core/src/runtime/idempotency.rs
// ============================================================================
// Module: Idempotency Guard
// Description: TTL-based duplicate suppression over a lock store.
// Purpose: Ensure at most one in-flight execution per idempotency key.
// Dependencies: crate::core, crate::interfaces, crate::runtime::store
// ============================================================================

//! ## Overview
//! The guard serializes check-and-lock per key so that concurrent requests
//! carrying the same key resolve to exactly one winner. A key locked within
//! its TTL refuses subsequent acquisitions until the holder releases it or
//! the TTL lapses. Release only clears the backing store entry; the per-key
//! mutex stays registered so a concurrent check-and-lock on the same key can
//! never race a freshly created one. Expired store entries and idle mutexes
//! are swept lazily on each acquisition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::Timestamp;
use crate::interfaces::LockStore;
use crate::interfaces::LockStoreError;
use crate::runtime::store::SharedLockStore;

// ============================================================================
// SECTION: Guard
// ============================================================================

/// Per-key registry of mutexes serializing check-and-lock.
type KeyedLocks = Mutex<BTreeMap<String, Arc<Mutex<()>>>>;

/// TTL idempotency guard over a pluggable lock store.
pub struct IdempotencyGuard {
    /// Backing store holding key expiry timestamps.
    store: SharedLockStore,
    /// Serialization points, one per active key.
    keyed: KeyedLocks,
}

impl IdempotencyGuard {
    /// Creates a guard over the given lock store.
    #[must_use]
    pub fn new(store: SharedLockStore) -> Self {
        Self {
            store,
            keyed: Mutex::new(BTreeMap::new()),
        }
    }

    /// Attempts to acquire the key for `ttl_seconds` starting at `now`.
    ///
    /// Returns `true` when this caller acquired the key and `false` when the
    /// key is already held within its TTL.
    ///
    /// # Errors
    ///
    /// Returns [`LockStoreError::Store`] on backing store failure.
    pub fn check_and_lock(
        &self,
        key: &str,
        ttl_seconds: u64,
        now: Timestamp,
    ) -> Result<bool, LockStoreError> {
        self.store.prune_expired(now)?;
        let point = self.serialization_point(key)?;
        let _serial = point
            .lock()
            .map_err(|err| LockStoreError::Store(err.to_string()))?;
        if let Some(expiry) = self.store.get(key)? {
            if now.is_before(expiry) {
                return Ok(false);
            }
        }
        let ttl_ms = i64::try_from(ttl_seconds.saturating_mul(1000))
            .map_err(|err| LockStoreError::Store(err.to_string()))?;
        self.store.set(key, now.saturating_add_millis(ttl_ms))?;
        Ok(true)
    }

    /// Releases a held key, allowing the next acquisition to succeed.
    ///
    /// Only the store entry is cleared. The per-key mutex stays in the
    /// registry: removing it while another thread holds a clone would let a
    /// later acquisition mint a second mutex for the same key, and the two
    /// holders could then pass the check-and-set window concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`LockStoreError::Store`] on backing store failure.
    pub fn release(&self, key: &str) -> Result<(), LockStoreError> {
        self.store.delete(key)
    }

    /// Returns the serialization mutex for a key, creating it on first use.
    ///
    /// Idle mutexes are swept here. A strong count of one means only the
    /// registry holds the point, and every clone is taken under the registry
    /// lock, so no thread can be inside or entering that critical section.
    fn serialization_point(&self, key: &str) -> Result<Arc<Mutex<()>>, LockStoreError> {
        let mut keyed = self
            .keyed
            .lock()
            .map_err(|err| LockStoreError::Store(err.to_string()))?;
        keyed.retain(|_, point| Arc::strong_count(point) > 1);
        let point = keyed
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Ok(Arc::clone(point))
    }
}
