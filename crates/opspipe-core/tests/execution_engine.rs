// crates/opspipe-core/tests/execution_engine.rs
// ============================================================================
// Module: Execution Engine Tests
// Description: Tests for effect computation and shadow/live routing.
// ============================================================================
//! ## Overview
//! Validates shadow/live effect equivalence, dispatcher isolation on the
//! shadow route, dead-letter parking, and breaker enforcement.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use std::sync::Arc;
use std::sync::Mutex;

use opspipe_core::CircuitBreaker;
use opspipe_core::ComputedEffect;
use opspipe_core::DispatchError;
use opspipe_core::DispatchReceipt;
use opspipe_core::Dispatcher;
use opspipe_core::DlqStore;
use opspipe_core::EngineError;
use opspipe_core::ExecutionEngine;
use opspipe_core::ExecutionMode;
use opspipe_core::ExecutionStatus;
use opspipe_core::InMemoryDlq;
use opspipe_core::InMemoryLockStore;
use opspipe_core::InMemoryTraceStore;
use opspipe_core::LockStore;
use opspipe_core::RetryPolicy;
use opspipe_core::SharedDlqStore;
use opspipe_core::SharedLockStore;
use opspipe_core::SharedTraceStore;
use opspipe_core::Timestamp;
use opspipe_core::TraceStore;
use opspipe_core::WorkItemId;
use opspipe_core::builtin_effect_rules;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Dispatcher that records every effect it receives.
#[derive(Clone, Default)]
struct RecordingDispatcher {
    /// Effects received so far.
    calls: Arc<Mutex<Vec<ComputedEffect>>>,
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&self, effect: &ComputedEffect) -> Result<DispatchReceipt, DispatchError> {
        self.calls.lock().unwrap().push(effect.clone());
        Ok(DispatchReceipt {
            target: effect.target.clone(),
            reference: Some("ok".to_string()),
        })
    }
}

/// Dispatcher that always fails.
#[derive(Clone, Default)]
struct FailingDispatcher {
    /// Number of attempts observed.
    attempts: Arc<Mutex<usize>>,
}

impl Dispatcher for FailingDispatcher {
    fn dispatch(&self, _effect: &ComputedEffect) -> Result<DispatchReceipt, DispatchError> {
        *self.attempts.lock().unwrap() += 1;
        Err(DispatchError::DispatchFailed("downstream unavailable".to_string()))
    }
}

/// Builds an engine around the given dispatcher with generous limits.
fn engine_with<D: Dispatcher>(
    dispatcher: D,
    breaker_budget: usize,
) -> (ExecutionEngine<D>, SharedTraceStore, SharedDlqStore) {
    let traces = SharedTraceStore::from_store(InMemoryTraceStore::new());
    let dlq = SharedDlqStore::from_store(InMemoryDlq::new());
    let engine = ExecutionEngine::new(
        dispatcher,
        builtin_effect_rules(),
        CircuitBreaker::new(breaker_budget, 60_000),
        RetryPolicy::new(1, 1, false),
        traces.clone(),
        dlq.clone(),
    );
    (engine, traces, dlq)
}

/// Request timestamp used across tests.
fn now() -> Timestamp {
    Timestamp::from_unix_millis(1_700_000_000_000)
}

// ============================================================================
// SECTION: Shadow Routing
// ============================================================================

#[test]
fn test_shadow_records_simulated_trace_without_dispatching() {
    let dispatcher = RecordingDispatcher::default();
    let calls = Arc::clone(&dispatcher.calls);
    let (engine, traces, _dlq) = engine_with(dispatcher, 10);

    let trace = engine
        .route_shadow(WorkItemId::new("wi-1"), "SendWeeklyReport", &json!({"week": 34}), now())
        .unwrap();

    assert_eq!(trace.mode, ExecutionMode::Shadow);
    assert_eq!(trace.status, ExecutionStatus::SimulatedSuccess);
    assert_eq!(trace.effects.len(), 2);
    assert_eq!(trace.effects[0].target.as_str(), "APPFOLIO_API");
    assert_eq!(trace.effects[0].action, "report_fetch");
    assert_eq!(trace.effects[1].target.as_str(), "SENDGRID_API");
    assert_eq!(trace.effects[1].action, "email_send");
    assert!(calls.lock().unwrap().is_empty());

    let stored = traces.recent(10).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].trace_id, trace.trace_id);
}

#[test]
fn test_shadow_and_live_compute_identical_effects() {
    let (engine, _traces, _dlq) = engine_with(RecordingDispatcher::default(), 10);
    let payload = json!({"tenant": "t-9"});
    let shadow = engine
        .route_shadow(WorkItemId::new("wi-s"), "SendWeeklyReport", &payload, now())
        .unwrap();
    let live = engine
        .route_live(WorkItemId::new("wi-l"), "SendWeeklyReport", &payload, now())
        .unwrap();
    assert_eq!(shadow.effects, live.effects);
}

// ============================================================================
// SECTION: Live Routing
// ============================================================================

#[test]
fn test_live_dispatches_every_effect() {
    let dispatcher = RecordingDispatcher::default();
    let calls = Arc::clone(&dispatcher.calls);
    let (engine, traces, dlq) = engine_with(dispatcher, 10);

    let trace = engine
        .route_live(WorkItemId::new("wi-2"), "SendWeeklyReport", &json!({}), now())
        .unwrap();

    assert_eq!(trace.mode, ExecutionMode::Live);
    assert_eq!(trace.status, ExecutionStatus::ExecutedSuccess);
    assert_eq!(calls.lock().unwrap().len(), 2);
    assert!(dlq.fetch().unwrap().is_empty());
    assert_eq!(traces.recent(10).unwrap().len(), 1);
}

#[test]
fn test_live_parks_exhausted_effects_and_halts() {
    let dispatcher = FailingDispatcher::default();
    let attempts = Arc::clone(&dispatcher.attempts);
    let (engine, traces, dlq) = engine_with(dispatcher, 10);

    let trace = engine
        .route_live(WorkItemId::new("wi-3"), "SendWeeklyReport", &json!({}), now())
        .unwrap();

    assert_eq!(trace.status, ExecutionStatus::Halted);
    // Two effects, each tried twice (initial attempt plus one retry).
    assert_eq!(*attempts.lock().unwrap(), 4);
    let parked = dlq.fetch().unwrap();
    assert_eq!(parked.len(), 2);
    assert!(parked[0].reason.contains("downstream unavailable"));
    assert_eq!(traces.recent(10).unwrap().len(), 1);
}

#[test]
fn test_live_single_effect_failure_still_records_other_dispatches() {
    let dispatcher = RecordingDispatcher::default();
    let (engine, _traces, dlq) = engine_with(dispatcher, 10);
    let trace = engine
        .route_live(WorkItemId::new("wi-4"), "NotifyTenantLedger", &json!({}), now())
        .unwrap();
    assert_eq!(trace.effects.len(), 1);
    assert_eq!(trace.status, ExecutionStatus::ExecutedSuccess);
    assert!(dlq.fetch().unwrap().is_empty());
}

// ============================================================================
// SECTION: Failure Modes
// ============================================================================

#[test]
fn test_unknown_workflow_is_rejected() {
    let (engine, traces, _dlq) = engine_with(RecordingDispatcher::default(), 10);
    let err = engine
        .route_shadow(WorkItemId::new("wi-5"), "NoSuchWorkflow", &json!({}), now())
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownWorkflow(name) if name == "NoSuchWorkflow"));
    assert!(traces.recent(10).unwrap().is_empty());
}

#[test]
fn test_breaker_trip_aborts_live_request_before_dispatch() {
    let dispatcher = RecordingDispatcher::default();
    let calls = Arc::clone(&dispatcher.calls);
    let (engine, traces, _dlq) = engine_with(dispatcher, 1);

    engine.route_live(WorkItemId::new("wi-6"), "SendWeeklyReport", &json!({}), now()).unwrap();
    let err = engine
        .route_live(WorkItemId::new("wi-7"), "SendWeeklyReport", &json!({}), now())
        .unwrap_err();

    assert!(matches!(err, EngineError::CircuitTripped(_)));
    // Only the first request reached the dispatcher.
    assert_eq!(calls.lock().unwrap().len(), 2);
    assert_eq!(traces.recent(10).unwrap().len(), 1);
}

#[test]
fn test_shadow_never_consumes_breaker_budget() {
    let (engine, _traces, _dlq) = engine_with(RecordingDispatcher::default(), 1);
    for index in 0..5 {
        engine
            .route_shadow(
                WorkItemId::new(format!("wi-{index}")),
                "SendWeeklyReport",
                &json!({}),
                now(),
            )
            .unwrap();
    }
}

// ============================================================================
// SECTION: Store Behavior
// ============================================================================

#[test]
fn test_trace_listing_returns_most_recent_first() {
    let (engine, traces, _dlq) = engine_with(RecordingDispatcher::default(), 100);
    for index in 0..5 {
        engine
            .route_shadow(
                WorkItemId::new(format!("wi-{index}")),
                "SyncLedgerSnapshot",
                &json!({"seq": index}),
                Timestamp::from_unix_millis(1_000 + index),
            )
            .unwrap();
    }
    let recent = traces.recent(3).unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].timestamp, Timestamp::from_unix_millis(1_004));
    assert_eq!(recent[2].timestamp, Timestamp::from_unix_millis(1_002));
}

#[test]
fn test_lock_store_round_trip() {
    let store = SharedLockStore::from_store(InMemoryLockStore::new());
    assert!(store.get("k").unwrap().is_none());
    store.set("k", Timestamp::from_unix_millis(99)).unwrap();
    assert_eq!(store.get("k").unwrap(), Some(Timestamp::from_unix_millis(99)));
    store.delete("k").unwrap();
    assert!(store.get("k").unwrap().is_none());
}
