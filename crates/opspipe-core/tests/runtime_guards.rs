// crates/opspipe-core/tests/runtime_guards.rs
// ============================================================================
// Module: Runtime Guard Tests
// Description: Tests for the circuit breaker, idempotency guard, and retry.
// ============================================================================
//! ## Overview
//! Validates breaker windowing, duplicate suppression, TTL expiry, and the
//! retry attempt budget.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use opspipe_core::BreakerError;
use opspipe_core::CircuitBreaker;
use opspipe_core::IdempotencyGuard;
use opspipe_core::InMemoryLockStore;
use opspipe_core::LockStore;
use opspipe_core::RetryPolicy;
use opspipe_core::SharedLockStore;
use opspipe_core::TargetSystem;
use opspipe_core::Timestamp;
use opspipe_core::with_retry;

// ============================================================================
// SECTION: Circuit Breaker
// ============================================================================

#[test]
fn test_breaker_admits_up_to_budget_then_trips() {
    let breaker = CircuitBreaker::new(3, 1_000);
    let target = TargetSystem::new("SENDGRID_API");
    let now = Timestamp::from_unix_millis(10_000);
    for _ in 0..3 {
        breaker.check_execution_tolerance(&target, now).unwrap();
    }
    let err = breaker.check_execution_tolerance(&target, now).unwrap_err();
    assert!(matches!(err, BreakerError::Tripped { count: 3, .. }));
}

#[test]
fn test_breaker_targets_are_independent() {
    let breaker = CircuitBreaker::new(1, 1_000);
    let now = Timestamp::from_unix_millis(10_000);
    breaker.check_execution_tolerance(&TargetSystem::new("APPFOLIO_API"), now).unwrap();
    breaker.check_execution_tolerance(&TargetSystem::new("SENDGRID_API"), now).unwrap();
    let err = breaker
        .check_execution_tolerance(&TargetSystem::new("APPFOLIO_API"), now)
        .unwrap_err();
    assert!(matches!(err, BreakerError::Tripped { .. }));
}

#[test]
fn test_breaker_recovers_after_window() {
    let breaker = CircuitBreaker::new(2, 1_000);
    let target = TargetSystem::new("APPFOLIO_API");
    let start = Timestamp::from_unix_millis(10_000);
    breaker.check_execution_tolerance(&target, start).unwrap();
    breaker.check_execution_tolerance(&target, start).unwrap();
    assert!(breaker.check_execution_tolerance(&target, start).is_err());

    let later = Timestamp::from_unix_millis(11_500);
    breaker.check_execution_tolerance(&target, later).unwrap();
}

// ============================================================================
// SECTION: Idempotency Guard
// ============================================================================

#[test]
fn test_duplicate_key_is_suppressed_until_release() {
    let guard = IdempotencyGuard::new(SharedLockStore::from_store(InMemoryLockStore::new()));
    let now = Timestamp::from_unix_millis(50_000);
    assert!(guard.check_and_lock("tenant-a:SendWeeklyReport", 60, now).unwrap());
    assert!(!guard.check_and_lock("tenant-a:SendWeeklyReport", 60, now).unwrap());

    guard.release("tenant-a:SendWeeklyReport").unwrap();
    assert!(guard.check_and_lock("tenant-a:SendWeeklyReport", 60, now).unwrap());
}

#[test]
fn test_expired_key_can_be_reacquired() {
    let guard = IdempotencyGuard::new(SharedLockStore::from_store(InMemoryLockStore::new()));
    let start = Timestamp::from_unix_millis(50_000);
    assert!(guard.check_and_lock("key", 60, start).unwrap());

    let within_ttl = Timestamp::from_unix_millis(50_000 + 59_999);
    assert!(!guard.check_and_lock("key", 60, within_ttl).unwrap());

    let after_ttl = Timestamp::from_unix_millis(50_000 + 60_000);
    assert!(guard.check_and_lock("key", 60, after_ttl).unwrap());
}

#[test]
fn test_keys_are_independent() {
    let guard = IdempotencyGuard::new(SharedLockStore::from_store(InMemoryLockStore::new()));
    let now = Timestamp::from_unix_millis(50_000);
    assert!(guard.check_and_lock("tenant-a:flow", 60, now).unwrap());
    assert!(guard.check_and_lock("tenant-b:flow", 60, now).unwrap());
}

#[test]
fn test_release_does_not_break_per_key_serialization() {
    let guard = IdempotencyGuard::new(SharedLockStore::from_store(InMemoryLockStore::new()));
    let holders = AtomicUsize::new(0);
    let now = Timestamp::from_unix_millis(50_000);
    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..200 {
                    if guard.check_and_lock("contended", 60, now).unwrap() {
                        let previous = holders.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(previous, 0, "two callers held the same key at once");
                        holders.fetch_sub(1, Ordering::SeqCst);
                        guard.release("contended").unwrap();
                    }
                }
            });
        }
    });
}

#[test]
fn test_expired_entries_are_swept_on_next_acquisition() {
    let store = SharedLockStore::from_store(InMemoryLockStore::new());
    let guard = IdempotencyGuard::new(store.clone());
    let start = Timestamp::from_unix_millis(50_000);
    assert!(guard.check_and_lock("stale-a", 60, start).unwrap());
    assert!(guard.check_and_lock("stale-b", 60, start).unwrap());

    let later = Timestamp::from_unix_millis(50_000 + 120_000);
    assert!(guard.check_and_lock("fresh", 60, later).unwrap());
    assert!(store.get("stale-a").unwrap().is_none());
    assert!(store.get("stale-b").unwrap().is_none());
}

#[test]
fn test_prune_expired_reports_removed_count() {
    let store = InMemoryLockStore::new();
    store.set("a", Timestamp::from_unix_millis(1_000)).unwrap();
    store.set("b", Timestamp::from_unix_millis(2_000)).unwrap();
    store.set("c", Timestamp::from_unix_millis(90_000)).unwrap();
    let removed = store.prune_expired(Timestamp::from_unix_millis(5_000)).unwrap();
    assert_eq!(removed, 2);
    assert!(store.get("c").unwrap().is_some());
}

// ============================================================================
// SECTION: Retry
// ============================================================================

#[test]
fn test_retry_succeeds_after_transient_failures() {
    let policy = RetryPolicy::new(3, 1, false);
    let calls = Arc::new(Mutex::new(0_u32));
    let counter = Arc::clone(&calls);
    let result: Result<u32, String> = with_retry(&policy, move || {
        let mut count = counter.lock().unwrap();
        *count += 1;
        if *count < 3 { Err("transient".to_string()) } else { Ok(*count) }
    });
    assert_eq!(result.unwrap(), 3);
    assert_eq!(*calls.lock().unwrap(), 3);
}

#[test]
fn test_retry_exhaustion_returns_final_error() {
    let policy = RetryPolicy::new(2, 1, false);
    let calls = Arc::new(Mutex::new(0_u32));
    let counter = Arc::clone(&calls);
    let result: Result<(), String> = with_retry(&policy, move || {
        *counter.lock().unwrap() += 1;
        Err("permanent".to_string())
    });
    assert_eq!(result.unwrap_err(), "permanent");
    // One initial attempt plus two retries.
    assert_eq!(*calls.lock().unwrap(), 3);
}

#[test]
fn test_retry_delay_doubles_without_jitter() {
    let policy = RetryPolicy::new(4, 100, false);
    assert_eq!(policy.delay_for_attempt(1).as_millis(), 100);
    assert_eq!(policy.delay_for_attempt(2).as_millis(), 200);
    assert_eq!(policy.delay_for_attempt(3).as_millis(), 400);
}

#[test]
fn test_retry_jitter_stays_within_ten_percent() {
    let policy = RetryPolicy::new(1, 1_000, true);
    for _ in 0..50 {
        let delay = policy.delay_for_attempt(1).as_millis();
        assert!((1_000..=1_100).contains(&delay));
    }
}
