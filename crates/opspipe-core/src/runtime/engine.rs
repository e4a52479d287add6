// crates/opspipe-core/src/runtime/engine.rs
// ============================================================================
// Module: Execution Engine
// Description: Effect computation and shadow/live routing.
// Purpose: Turn an approved workflow request into a recorded execution trace.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! Effect computation is an ordered first-match walk over registered effect
//! rules: the first rule whose workflow name matches contributes its full
//! effect list, and later rules are ignored. Shadow routing records the
//! computed effects without touching the dispatcher. Live routing admits
//! each effect through the circuit breaker, dispatches it under the retry
//! policy, and parks retry-exhausted effects on the dead letter queue; the
//! trace is marked halted when any effect failed. Both routes drive the
//! work item through the full state path and append the finished trace to
//! the trace store. Shadow and live produce identical effect lists for the
//! same request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::core::ComputedEffect;
use crate::core::ExecutionMode;
use crate::core::ExecutionStatus;
use crate::core::ExecutionTrace;
use crate::core::TargetSystem;
use crate::core::Timestamp;
use crate::core::TraceId;
use crate::core::TransitionContext;
use crate::core::TransitionError;
use crate::core::WorkItem;
use crate::core::WorkItemId;
use crate::core::WorkItemState;
use crate::interfaces::DispatchError;
use crate::interfaces::Dispatcher;
use crate::interfaces::DlqError;
use crate::interfaces::DlqRecord;
use crate::interfaces::DlqStore;
use crate::interfaces::TraceStore;
use crate::interfaces::TraceStoreError;
use crate::runtime::breaker::BreakerError;
use crate::runtime::breaker::CircuitBreaker;
use crate::runtime::retry::RetryPolicy;
use crate::runtime::retry::with_retry;
use crate::runtime::store::SharedDlqStore;
use crate::runtime::store::SharedTraceStore;

// ============================================================================
// SECTION: Effect Rules
// ============================================================================

/// One effect emitted by an effect rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectTemplate {
    /// Downstream system the effect targets.
    pub target: TargetSystem,
    /// Action identifier understood by the target.
    pub action: String,
}

/// Ordered first-match rule mapping a workflow name to its effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectRule {
    /// Workflow name this rule matches exactly.
    pub workflow_name: String,
    /// Effects computed when the rule matches, in dispatch order.
    pub effects: Vec<EffectTemplate>,
}

/// Builtin effect catalog used when no catalog is supplied.
#[must_use]
pub fn builtin_effect_rules() -> Vec<EffectRule> {
    vec![
        EffectRule {
            workflow_name: "SendWeeklyReport".to_string(),
            effects: vec![
                EffectTemplate {
                    target: TargetSystem::new("APPFOLIO_API"),
                    action: "report_fetch".to_string(),
                },
                EffectTemplate {
                    target: TargetSystem::new("SENDGRID_API"),
                    action: "email_send".to_string(),
                },
            ],
        },
        EffectRule {
            workflow_name: "NotifyTenantLedger".to_string(),
            effects: vec![EffectTemplate {
                target: TargetSystem::new("SENDGRID_API"),
                action: "email_send".to_string(),
            }],
        },
        EffectRule {
            workflow_name: "SyncLedgerSnapshot".to_string(),
            effects: vec![EffectTemplate {
                target: TargetSystem::new("APPFOLIO_API"),
                action: "ledger_sync".to_string(),
            }],
        },
    ]
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Engine failures that abort a request before a trace is recorded.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No effect rule matches the workflow name.
    #[error("unknown workflow: {0}")]
    UnknownWorkflow(String),
    /// A work item transition violated the state machine.
    #[error("transition error: {0}")]
    Transition(#[from] TransitionError),
    /// The circuit breaker refused an effect's target.
    #[error("circuit tripped: {0}")]
    CircuitTripped(#[from] BreakerError),
    /// The trace store rejected the finished trace.
    #[error("trace store error: {0}")]
    TraceStore(#[from] TraceStoreError),
    /// The dead letter queue rejected a parked effect.
    #[error("dead letter error: {0}")]
    DeadLetter(#[from] DlqError),
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Workflow execution engine generic over the dispatch boundary.
pub struct ExecutionEngine<D: Dispatcher> {
    /// Side-effect dispatcher used only on the live route.
    dispatcher: D,
    /// Ordered effect catalog.
    rules: Vec<EffectRule>,
    /// Per-target execution breaker.
    breaker: CircuitBreaker,
    /// Retry schedule for live dispatch.
    retry: RetryPolicy,
    /// Store receiving finished traces.
    traces: SharedTraceStore,
    /// Queue receiving retry-exhausted effects.
    dlq: SharedDlqStore,
}

impl<D: Dispatcher> ExecutionEngine<D> {
    /// Creates an engine over the given dispatcher and runtime services.
    #[must_use]
    pub fn new(
        dispatcher: D,
        rules: Vec<EffectRule>,
        breaker: CircuitBreaker,
        retry: RetryPolicy,
        traces: SharedTraceStore,
        dlq: SharedDlqStore,
    ) -> Self {
        Self {
            dispatcher,
            rules,
            breaker,
            retry,
            traces,
            dlq,
        }
    }

    /// Computes the effect list for a workflow without dispatching anything.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownWorkflow`] when no rule matches.
    pub fn compute_side_effects(
        &self,
        workflow_name: &str,
        payload: &Value,
    ) -> Result<Vec<ComputedEffect>, EngineError> {
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.workflow_name == workflow_name)
            .ok_or_else(|| EngineError::UnknownWorkflow(workflow_name.to_string()))?;
        Ok(rule
            .effects
            .iter()
            .map(|template| ComputedEffect {
                target: template.target.clone(),
                action: template.action.clone(),
                payload_drop: payload.clone(),
            })
            .collect())
    }

    /// Simulates a workflow and records a shadow trace.
    ///
    /// The dispatcher is never invoked on this route.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on an unknown workflow, a state machine
    /// violation, or trace store failure.
    pub fn route_shadow(
        &self,
        work_item_id: WorkItemId,
        workflow_name: &str,
        payload: &Value,
        now: Timestamp,
    ) -> Result<ExecutionTrace, EngineError> {
        let effects = self.compute_side_effects(workflow_name, payload)?;
        let mut item = WorkItem::new(work_item_id);
        self.advance_to_approved(&mut item)?;
        item.advance(WorkItemState::MessagePreview, &TransitionContext::new())?;
        item.advance(WorkItemState::Complete, &TransitionContext::new())?;
        let trace = ExecutionTrace {
            trace_id: TraceId::new(Uuid::new_v4().to_string()),
            mode: ExecutionMode::Shadow,
            status: ExecutionStatus::SimulatedSuccess,
            effects,
            timestamp: now,
        };
        self.traces.append(&trace)?;
        Ok(trace)
    }

    /// Executes a workflow for real and records a live trace.
    ///
    /// Each effect is independently admitted through the breaker and
    /// dispatched under the retry policy. A retry-exhausted effect is parked
    /// on the dead letter queue and the trace is marked halted; remaining
    /// effects are still attempted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CircuitTripped`] when any effect's target is
    /// over budget, and other [`EngineError`] variants on unknown workflows,
    /// state machine violations, or store failures.
    pub fn route_live(
        &self,
        work_item_id: WorkItemId,
        workflow_name: &str,
        payload: &Value,
        now: Timestamp,
    ) -> Result<ExecutionTrace, EngineError> {
        let effects = self.compute_side_effects(workflow_name, payload)?;
        for effect in &effects {
            self.breaker.check_execution_tolerance(&effect.target, now)?;
        }
        let mut item = WorkItem::new(work_item_id);
        self.advance_to_approved(&mut item)?;
        item.advance(WorkItemState::Execution, &TransitionContext::new())?;
        let mut halted = false;
        for effect in &effects {
            if let Err(err) = self.dispatch_with_retry(effect) {
                self.dlq.push(DlqRecord {
                    payload: json!({
                        "target": effect.target.as_str(),
                        "action": effect.action,
                        "payloadDrop": effect.payload_drop,
                    }),
                    reason: err.to_string(),
                    timestamp: now,
                })?;
                halted = true;
            }
        }
        if halted {
            item.advance(
                WorkItemState::Stop,
                &TransitionContext::new().with_reason("DISPATCH_EXHAUSTED"),
            )?;
        } else {
            item.advance(WorkItemState::Complete, &TransitionContext::new())?;
        }
        let trace = ExecutionTrace {
            trace_id: TraceId::new(Uuid::new_v4().to_string()),
            mode: ExecutionMode::Live,
            status: if halted {
                ExecutionStatus::Halted
            } else {
                ExecutionStatus::ExecutedSuccess
            },
            effects,
            timestamp: now,
        };
        self.traces.append(&trace)?;
        Ok(trace)
    }

    /// Drives a fresh work item from init through approval.
    fn advance_to_approved(&self, item: &mut WorkItem) -> Result<(), TransitionError> {
        let ctx = TransitionContext::new();
        item.advance(WorkItemState::IdentityCheck, &ctx)?;
        item.advance(WorkItemState::LedgerParse, &ctx)?;
        item.advance(WorkItemState::Eligibility, &ctx)?;
        item.advance(WorkItemState::Decision, &ctx)?;
        item.advance(WorkItemState::Approved, &ctx)?;
        Ok(())
    }

    /// Dispatches one effect under the retry policy.
    fn dispatch_with_retry(&self, effect: &ComputedEffect) -> Result<(), DispatchError> {
        with_retry(&self.retry, || self.dispatcher.dispatch(effect)).map(|_receipt| ())
    }
}
