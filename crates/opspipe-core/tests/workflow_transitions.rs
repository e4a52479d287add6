// crates/opspipe-core/tests/workflow_transitions.rs
// ============================================================================
// Module: Workflow Transition Tests
// Description: Tests for the work item state machine.
// ============================================================================
//! ## Overview
//! Validates the transition table, terminal states, and hold override rules.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use opspipe_core::TransitionContext;
use opspipe_core::TransitionError;
use opspipe_core::WorkItem;
use opspipe_core::WorkItemId;
use opspipe_core::WorkItemState;
use opspipe_core::transition;
use proptest::prelude::Just;
use proptest::prelude::Strategy;
use proptest::prop_oneof;
use proptest::proptest;

/// Every lifecycle state, for exhaustive property checks.
const ALL_STATES: [WorkItemState; 11] = [
    WorkItemState::Init,
    WorkItemState::IdentityCheck,
    WorkItemState::LedgerParse,
    WorkItemState::Eligibility,
    WorkItemState::Decision,
    WorkItemState::Hold,
    WorkItemState::Stop,
    WorkItemState::Approved,
    WorkItemState::MessagePreview,
    WorkItemState::Execution,
    WorkItemState::Complete,
];

/// Strategy producing any lifecycle state.
fn any_state() -> impl Strategy<Value = WorkItemState> {
    prop_oneof![
        Just(WorkItemState::Init),
        Just(WorkItemState::IdentityCheck),
        Just(WorkItemState::LedgerParse),
        Just(WorkItemState::Eligibility),
        Just(WorkItemState::Decision),
        Just(WorkItemState::Hold),
        Just(WorkItemState::Stop),
        Just(WorkItemState::Approved),
        Just(WorkItemState::MessagePreview),
        Just(WorkItemState::Execution),
        Just(WorkItemState::Complete),
    ]
}

// ============================================================================
// SECTION: Legal Transitions
// ============================================================================

#[test]
fn test_init_advances_to_identity_check() {
    let ctx = TransitionContext::new();
    let next = transition(WorkItemState::Init, WorkItemState::IdentityCheck, &ctx).unwrap();
    assert_eq!(next, WorkItemState::IdentityCheck);
}

#[test]
fn test_full_live_path_is_legal() {
    let ctx = TransitionContext::new();
    let path = [
        WorkItemState::IdentityCheck,
        WorkItemState::LedgerParse,
        WorkItemState::Eligibility,
        WorkItemState::Decision,
        WorkItemState::Approved,
        WorkItemState::Execution,
        WorkItemState::Complete,
    ];
    let mut item = WorkItem::new(WorkItemId::new("wi-1"));
    for target in path {
        item.advance(target, &ctx).unwrap();
    }
    assert_eq!(item.state, WorkItemState::Complete);
}

#[test]
fn test_shadow_path_through_message_preview() {
    let ctx = TransitionContext::new();
    let mut item = WorkItem::new(WorkItemId::new("wi-2"));
    for target in [
        WorkItemState::IdentityCheck,
        WorkItemState::LedgerParse,
        WorkItemState::Eligibility,
        WorkItemState::Decision,
        WorkItemState::Approved,
        WorkItemState::MessagePreview,
        WorkItemState::Complete,
    ] {
        item.advance(target, &ctx).unwrap();
    }
    assert_eq!(item.state, WorkItemState::Complete);
}

// ============================================================================
// SECTION: Illegal Transitions
// ============================================================================

#[test]
fn test_init_cannot_jump_to_execution() {
    let ctx = TransitionContext::new();
    let err = transition(WorkItemState::Init, WorkItemState::Execution, &ctx).unwrap_err();
    assert_eq!(
        err,
        TransitionError::Illegal {
            from: "INIT",
            to: "EXECUTION",
        }
    );
}

#[test]
fn test_stop_is_terminal() {
    let ctx = TransitionContext::new();
    for target in ALL_STATES {
        let err = transition(WorkItemState::Stop, target, &ctx).unwrap_err();
        assert_eq!(err, TransitionError::Terminal("STOP"));
    }
}

#[test]
fn test_complete_is_terminal() {
    let ctx = TransitionContext::new();
    for target in ALL_STATES {
        let err = transition(WorkItemState::Complete, target, &ctx).unwrap_err();
        assert_eq!(err, TransitionError::Terminal("COMPLETE"));
    }
}

#[test]
fn test_failed_advance_leaves_item_untouched() {
    let ctx = TransitionContext::new();
    let mut item = WorkItem::new(WorkItemId::new("wi-3"));
    assert!(item.advance(WorkItemState::Complete, &ctx).is_err());
    assert_eq!(item.state, WorkItemState::Init);
}

// ============================================================================
// SECTION: Hold Override
// ============================================================================

#[test]
fn test_hold_requires_override_to_approve() {
    let plain = TransitionContext::new();
    let err = transition(WorkItemState::Hold, WorkItemState::Approved, &plain).unwrap_err();
    assert_eq!(err, TransitionError::HoldOverrideRequired("APPROVED"));

    let with_override = TransitionContext::with_override();
    let next = transition(WorkItemState::Hold, WorkItemState::Approved, &with_override).unwrap();
    assert_eq!(next, WorkItemState::Approved);
}

#[test]
fn test_hold_exit_to_stop_also_requires_override() {
    let plain = TransitionContext::new();
    let err = transition(WorkItemState::Hold, WorkItemState::Stop, &plain).unwrap_err();
    assert_eq!(err, TransitionError::HoldOverrideRequired("STOP"));
}

#[test]
fn test_reason_code_recorded_on_stop() {
    let ctx = TransitionContext::new().with_reason("ELIGIBILITY_FAILED");
    let mut item = WorkItem::new(WorkItemId::new("wi-4"));
    item.advance(WorkItemState::Stop, &ctx).unwrap();
    assert_eq!(item.reason_code.as_deref(), Some("ELIGIBILITY_FAILED"));
}

// ============================================================================
// SECTION: Totality
// ============================================================================

proptest! {
    #[test]
    fn test_transition_is_total(current in any_state(), target in any_state()) {
        let ctx = TransitionContext::with_override();
        match transition(current, target, &ctx) {
            Ok(next) => {
                assert!(current.allowed_targets().contains(&next));
                assert!(!current.is_terminal());
            }
            Err(TransitionError::Terminal(_)) => assert!(current.is_terminal()),
            Err(TransitionError::Illegal { .. }) => {
                assert!(!current.allowed_targets().contains(&target));
            }
            Err(TransitionError::HoldOverrideRequired(_)) => {
                unreachable!("override is set, hold exits must not require it");
            }
        }
    }
}
