// crates/opspipe-core/src/core/workflow.rs
// ============================================================================
// Module: Workflow State Machine
// Description: Total, fail-closed transition table over the work item lifecycle.
// Purpose: Validate every lifecycle transition before any state is persisted.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! The workflow state machine is a pure transition validator: it holds no
//! shared state and ownership of a work item's persisted state lies with the
//! caller. The transition table is total by construction: `allowed_targets`
//! is an exhaustive match over every state, so an unmapped state cannot exist
//! at runtime. Illegal transitions are hard errors; callers must abort the
//! whole operation rather than continue with a degraded state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::WorkItemId;

// ============================================================================
// SECTION: States
// ============================================================================

/// Lifecycle states of a work item.
///
/// # Invariants
/// - `Stop` and `Complete` are terminal; no outgoing transition exists.
/// - `Hold` may only advance with an explicit override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkItemState {
    /// Work item created, nothing verified yet.
    Init,
    /// Caller identity verification in progress.
    IdentityCheck,
    /// Ledger records being parsed for the work item.
    LedgerParse,
    /// Eligibility rules being applied.
    Eligibility,
    /// Admission decision pending.
    Decision,
    /// Parked pending an explicit operator override.
    Hold,
    /// Terminal rejection; the work item is archived.
    Stop,
    /// Admission approved.
    Approved,
    /// Outbound message preview computed without dispatch.
    MessagePreview,
    /// Side effects being dispatched.
    Execution,
    /// Terminal success; the work item is archived.
    Complete,
}

impl WorkItemState {
    /// Returns the set of states this state may legally transition to.
    ///
    /// The match is exhaustive: every state has an explicit rule, so the
    /// table is total and fail-closed by construction.
    #[must_use]
    pub const fn allowed_targets(self) -> &'static [Self] {
        match self {
            Self::Init => &[Self::IdentityCheck, Self::Stop],
            Self::IdentityCheck => &[Self::LedgerParse, Self::Stop],
            Self::LedgerParse => &[Self::Eligibility, Self::Stop],
            Self::Eligibility => &[Self::Decision, Self::Stop],
            Self::Decision => &[Self::Hold, Self::Approved, Self::Stop],
            Self::Hold => &[Self::Approved, Self::Stop],
            Self::Approved => &[Self::MessagePreview, Self::Execution, Self::Stop],
            Self::MessagePreview => &[Self::Execution, Self::Complete, Self::Stop],
            Self::Execution => &[Self::Complete, Self::Stop],
            Self::Stop | Self::Complete => &[],
        }
    }

    /// Returns true when the state is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stop | Self::Complete)
    }

    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::IdentityCheck => "IDENTITY_CHECK",
            Self::LedgerParse => "LEDGER_PARSE",
            Self::Eligibility => "ELIGIBILITY",
            Self::Decision => "DECISION",
            Self::Hold => "HOLD",
            Self::Stop => "STOP",
            Self::Approved => "APPROVED",
            Self::MessagePreview => "MESSAGE_PREVIEW",
            Self::Execution => "EXECUTION",
            Self::Complete => "COMPLETE",
        }
    }
}

// ============================================================================
// SECTION: Transition Validation
// ============================================================================

/// Caller-supplied context for a transition attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionContext {
    /// Explicit operator override required to advance out of `Hold`.
    #[serde(default)]
    pub hold_override: bool,
    /// Optional reason code recorded alongside the transition.
    #[serde(default)]
    pub reason_code: Option<String>,
}

impl TransitionContext {
    /// Builds a plain context with no override and no reason code.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hold_override: false,
            reason_code: None,
        }
    }

    /// Builds a context carrying an explicit hold override.
    #[must_use]
    pub const fn with_override() -> Self {
        Self {
            hold_override: true,
            reason_code: None,
        }
    }

    /// Attaches a reason code to the context.
    #[must_use]
    pub fn with_reason(mut self, code: &str) -> Self {
        self.reason_code = Some(code.to_string());
        self
    }
}

/// Transition validation errors. Every variant is a hard security boundary;
/// a caller receiving one must abort the whole operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// Target state is not in the allowed set for the current state.
    #[error("illegal transition: {from} -> {to}")]
    Illegal {
        /// State the work item was in.
        from: &'static str,
        /// State the caller attempted to reach.
        to: &'static str,
    },
    /// Current state is terminal and has no outgoing transitions.
    #[error("state {0} is terminal")]
    Terminal(&'static str),
    /// Advancing out of `Hold` requires an explicit override.
    #[error("hold override required to reach {0}")]
    HoldOverrideRequired(&'static str),
}

/// Validates a transition and returns the new state on success.
///
/// # Errors
///
/// Returns [`TransitionError`] when the target is outside the allowed set,
/// the current state is terminal, or a `Hold` exit lacks an override.
pub fn transition(
    current: WorkItemState,
    target: WorkItemState,
    ctx: &TransitionContext,
) -> Result<WorkItemState, TransitionError> {
    if current.is_terminal() {
        return Err(TransitionError::Terminal(current.label()));
    }
    if !current.allowed_targets().contains(&target) {
        return Err(TransitionError::Illegal {
            from: current.label(),
            to: target.label(),
        });
    }
    if current == WorkItemState::Hold && !ctx.hold_override {
        return Err(TransitionError::HoldOverrideRequired(target.label()));
    }
    Ok(target)
}

// ============================================================================
// SECTION: Work Item
// ============================================================================

/// Work item owned by the workflow state machine's callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Work item identifier.
    pub id: WorkItemId,
    /// Current lifecycle state.
    pub state: WorkItemState,
    /// Reason code recorded by the most recent transition, if any.
    pub reason_code: Option<String>,
}

impl WorkItem {
    /// Creates a work item at `Init`.
    #[must_use]
    pub const fn new(id: WorkItemId) -> Self {
        Self {
            id,
            state: WorkItemState::Init,
            reason_code: None,
        }
    }

    /// Advances the work item, mutating state only when the transition is legal.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] and leaves the work item untouched when the
    /// transition is rejected.
    pub fn advance(
        &mut self,
        target: WorkItemState,
        ctx: &TransitionContext,
    ) -> Result<(), TransitionError> {
        let next = transition(self.state, target, ctx)?;
        self.state = next;
        if ctx.reason_code.is_some() {
            self.reason_code = ctx.reason_code.clone();
        }
        Ok(())
    }
}
