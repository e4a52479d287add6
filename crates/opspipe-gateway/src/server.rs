// crates/opspipe-gateway/src/server.rs
// ============================================================================
// Module: Gateway Server
// Description: HTTP surface for orchestration and envelope ingestion.
// Purpose: Run every request through the fixed admission pipeline and route
//          approved workflows into the execution engine.
// Dependencies: opspipe-config, opspipe-core, axum, tokio
// ============================================================================

//! ## Overview
//! Four routes: `POST /orchestration/shadow`, `POST /orchestration/live`,
//! `GET /orchestration/traces`, and `POST /orchestration/envelope`. Every
//! request passes the same pipeline in a fixed order: JWT firewall, role
//! check, schema gate, tenant guard, idempotency guard, policy evaluation,
//! then the execution engine. A failure at any stage aborts the request and
//! later stages never run. Engine calls shift to a blocking context because
//! dispatch and retry sleeps are synchronous.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use opspipe_config::DispatchMode;
use opspipe_config::OpspipeConfig;
use opspipe_core::CircuitBreaker;
use opspipe_core::ComputedEffect;
use opspipe_core::EngineError;
use opspipe_core::ExecutionEngine;
use opspipe_core::ExecutionMode;
use opspipe_core::ExecutionStatus;
use opspipe_core::ExecutionTrace;
use opspipe_core::IdempotencyGuard;
use opspipe_core::InMemoryDlq;
use opspipe_core::InMemoryLockStore;
use opspipe_core::InMemoryTraceStore;
use opspipe_core::PipeEnvelope;
use opspipe_core::PolicyEngine;
use opspipe_core::PolicyId;
use opspipe_core::Redactor;
use opspipe_core::RetryPolicy;
use opspipe_core::SharedDlqStore;
use opspipe_core::SharedLockStore;
use opspipe_core::SharedTraceStore;
use opspipe_core::Timestamp;
use opspipe_core::TraceId;
use opspipe_core::TraceStore;
use opspipe_core::WorkItemId;
use opspipe_core::WorkspaceId;
use opspipe_core::builtin_effect_rules;
use opspipe_core::enforce_workspace;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::audit::AuditEvent;
use crate::audit::AuditSink;
use crate::audit::StderrAuditSink;
use crate::auth::AuthContext;
use crate::auth::AuthError;
use crate::auth::JwtAuthority;
use crate::auth::require_live_role;
use crate::auth::require_trace_role;
use crate::dispatch::LoggingDispatcher;
use crate::dispatch::SharedDispatcher;
use crate::schema::SchemaGate;
use crate::schema::SchemaViolation;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of traces returned by the trace listing.
const TRACE_LISTING_LIMIT: usize = 100;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway construction and serve errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration was rejected.
    #[error("config error: {0}")]
    Config(String),
    /// A component failed to initialize.
    #[error("init error: {0}")]
    Init(String),
    /// The HTTP transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Gateway server instance.
pub struct GatewayServer {
    /// Bind address for the HTTP listener.
    bind: String,
    /// Shared request-handling state.
    state: Arc<GatewayState>,
}

/// Shared state behind every handler.
struct GatewayState {
    /// JWT firewall.
    authority: JwtAuthority,
    /// Compiled request schemas.
    schema: SchemaGate,
    /// Admission policy engine.
    policies: PolicyEngine,
    /// Policy evaluated before any workflow is admitted.
    gate_policy: PolicyId,
    /// Idempotency guard.
    idempotency: IdempotencyGuard,
    /// Idempotency key TTL in seconds.
    idempotency_ttl_seconds: u64,
    /// Execution engine over the configured dispatcher.
    engine: ExecutionEngine<SharedDispatcher>,
    /// Trace store shared with the engine.
    traces: SharedTraceStore,
    /// Field masker applied before policy contexts are logged.
    redactor: Redactor,
    /// Audit sink for security-relevant decisions.
    audit: Arc<dyn AuditSink>,
    /// Maximum accepted request body size.
    max_body_bytes: usize,
}

impl GatewayServer {
    /// Builds a gateway from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when configuration is invalid or a component
    /// fails to initialize.
    pub fn from_config(config: OpspipeConfig) -> Result<Self, GatewayError> {
        config.validate().map_err(|err| GatewayError::Config(err.to_string()))?;
        let dispatcher = match config.dispatch.mode {
            DispatchMode::Logging => SharedDispatcher::from_dispatcher(Arc::new(LoggingDispatcher)),
        };
        Self::with_dispatcher(config, dispatcher, Arc::new(StderrAuditSink))
    }

    /// Builds a gateway with an explicit dispatcher and audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when a component fails to initialize.
    pub fn with_dispatcher(
        config: OpspipeConfig,
        dispatcher: SharedDispatcher,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, GatewayError> {
        let authority = JwtAuthority::new(&config.auth.signing_secret)
            .map_err(|err| GatewayError::Init(err.to_string()))?;
        let schema = SchemaGate::new().map_err(|err| GatewayError::Init(err.to_string()))?;
        let traces = SharedTraceStore::from_store(InMemoryTraceStore::new());
        let dlq = SharedDlqStore::from_store(InMemoryDlq::new());
        let locks = SharedLockStore::from_store(InMemoryLockStore::new());
        let breaker = CircuitBreaker::new(
            config.breaker.max_executions_per_window,
            config.breaker.window_ms,
        );
        let retry = RetryPolicy::new(
            config.retry.max_retries,
            config.retry.base_delay_ms,
            config.retry.use_jitter,
        );
        let engine = ExecutionEngine::new(
            dispatcher,
            builtin_effect_rules(),
            breaker,
            retry,
            traces.clone(),
            dlq,
        );
        let state = Arc::new(GatewayState {
            authority,
            schema,
            policies: PolicyEngine::with_builtins(),
            gate_policy: PolicyId::new(config.policy.gate_policy.as_str()),
            idempotency: IdempotencyGuard::new(locks),
            idempotency_ttl_seconds: config.idempotency.ttl_seconds,
            engine,
            traces,
            redactor: Redactor::new(&config.redaction.pii_fields),
            audit,
            max_body_bytes: config.server.max_body_bytes,
        });
        Ok(Self {
            bind: config.server.bind,
            state,
        })
    }

    /// Returns the request router, mainly for in-process testing.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/orchestration/shadow", post(handle_shadow))
            .route("/orchestration/live", post(handle_live))
            .route("/orchestration/traces", get(handle_traces))
            .route("/orchestration/envelope", post(handle_envelope))
            .with_state(Arc::clone(&self.state))
    }

    /// Serves requests until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let addr: SocketAddr = self
            .bind
            .parse()
            .map_err(|_| GatewayError::Config("invalid bind address".to_string()))?;
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| GatewayError::Transport("http bind failed".to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|_| GatewayError::Transport("http server failed".to_string()))
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Successful orchestration response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrchestrationResponse {
    /// Human-readable outcome summary.
    message: String,
    /// Recorded trace identifier.
    trace_id: TraceId,
    /// Execution mode of the trace.
    mode: ExecutionMode,
    /// Aggregate outcome of the trace.
    status: ExecutionStatus,
    /// Effects computed for the workflow.
    effects: Vec<ComputedEffect>,
}

impl OrchestrationResponse {
    /// Builds a response from a recorded trace.
    fn from_trace(trace: ExecutionTrace) -> Self {
        let message = match trace.status {
            ExecutionStatus::SimulatedSuccess => "workflow simulated".to_string(),
            ExecutionStatus::ExecutedSuccess => "workflow executed".to_string(),
            ExecutionStatus::Halted => {
                "workflow halted: one or more effects failed dispatch".to_string()
            }
        };
        Self {
            message,
            trace_id: trace.trace_id,
            mode: trace.mode,
            status: trace.status,
            effects: trace.effects,
        }
    }
}

/// Error response body.
fn error_body(code: &str, message: &str) -> Value {
    json!({ "error": code, "message": message })
}

/// Error response body carrying schema violations.
fn violation_body(violations: &[SchemaViolation]) -> Value {
    json!({
        "error": "BAD_REQUEST",
        "message": "request body failed schema validation",
        "violations": violations,
    })
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles `POST /orchestration/shadow`.
async fn handle_shadow(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    run_orchestration(&state, &headers, &bytes, ExecutionMode::Shadow)
}

/// Handles `POST /orchestration/live`.
async fn handle_live(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    run_orchestration(&state, &headers, &bytes, ExecutionMode::Live)
}

/// Handles `GET /orchestration/traces`.
async fn handle_traces(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let auth = match authenticate(&state, &headers, "traces") {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    if let Err(err) = require_trace_role(&auth) {
        state.audit.record(&AuditEvent::auth_denied("traces", &err));
        return (StatusCode::FORBIDDEN, axum::Json(error_body("FORBIDDEN", &err.to_string())));
    }
    match state.traces.recent(TRACE_LISTING_LIMIT) {
        Ok(traces) => (StatusCode::OK, axum::Json(json!({ "traces": traces }))),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(error_body("INTERNAL", &err.to_string())),
        ),
    }
}

/// Handles `POST /orchestration/envelope`.
async fn handle_envelope(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    let auth = match authenticate(&state, &headers, "envelope") {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    let mut body = match parse_body(&state, &bytes) {
        Ok(body) => body,
        Err(response) => return response,
    };
    if let Err(violations) = state.schema.check_envelope(&mut body) {
        return (StatusCode::BAD_REQUEST, axum::Json(violation_body(&violations)));
    }
    let envelope: PipeEnvelope = match serde_json::from_value(body) {
        Ok(envelope) => envelope,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(error_body("BAD_REQUEST", &err.to_string())),
            );
        }
    };
    let active = WorkspaceId::new(auth.tenant_id.as_str());
    if let Err(violation) = enforce_workspace(&envelope, &active) {
        state.audit.record(&AuditEvent::tenant_violation(
            "envelope",
            &auth,
            &violation.to_string(),
        ));
        return (
            StatusCode::FORBIDDEN,
            axum::Json(error_body("TENANT_VIOLATION", &violation.to_string())),
        );
    }
    (
        StatusCode::ACCEPTED,
        axum::Json(json!({
            "message": "envelope accepted",
            "workItemId": envelope.work_item_id,
        })),
    )
}

// ============================================================================
// SECTION: Orchestration Pipeline
// ============================================================================

/// Runs the full admission pipeline and routes into the engine.
fn run_orchestration(
    state: &GatewayState,
    headers: &HeaderMap,
    bytes: &Bytes,
    mode: ExecutionMode,
) -> (StatusCode, axum::Json<Value>) {
    let stage = match mode {
        ExecutionMode::Shadow => "shadow",
        ExecutionMode::Live => "live",
    };
    let auth = match authenticate(state, headers, stage) {
        Ok(auth) => auth,
        Err(response) => return response,
    };
    if mode == ExecutionMode::Live {
        if let Err(err) = require_live_role(&auth) {
            state.audit.record(&AuditEvent::auth_denied(stage, &err));
            return (StatusCode::FORBIDDEN, axum::Json(error_body("FORBIDDEN", &err.to_string())));
        }
    }
    let mut body = match parse_body(state, bytes) {
        Ok(body) => body,
        Err(response) => return response,
    };
    if let Err(violations) = state.schema.check_workflow_request(&mut body) {
        return (StatusCode::BAD_REQUEST, axum::Json(violation_body(&violations)));
    }
    let workflow_name = body
        .get("workflowName")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let payload = body.get("payload").cloned().unwrap_or_else(|| json!({}));
    let now = current_time();

    let idempotency_key = body
        .get("idempotencyKey")
        .and_then(Value::as_str)
        .map_or_else(
            || format!("{}:{workflow_name}", auth.tenant_id.as_str()),
            ToString::to_string,
        );
    match state.idempotency.check_and_lock(&idempotency_key, state.idempotency_ttl_seconds, now) {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::CONFLICT,
                axum::Json(error_body("DUPLICATE_REQUEST", "request is already in flight")),
            );
        }
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(error_body("INTERNAL", &err.to_string())),
            );
        }
    }

    let response = admit_and_route(state, &auth, &workflow_name, &payload, mode, now, stage);
    // A completed request keeps its key until the TTL lapses; a rejected one
    // frees the key immediately so the caller can retry.
    if !response.0.is_success() {
        if let Err(err) = state.idempotency.release(&idempotency_key) {
            state.audit.record(&AuditEvent::store_failure(stage, &err.to_string()));
        }
    }
    response
}

/// Evaluates the gate policy and routes the workflow once admitted.
fn admit_and_route(
    state: &GatewayState,
    auth: &AuthContext,
    workflow_name: &str,
    payload: &Value,
    mode: ExecutionMode,
    now: Timestamp,
    stage: &str,
) -> (StatusCode, axum::Json<Value>) {
    let mut context = Map::new();
    context.insert("workflowName".to_string(), Value::String(workflow_name.to_string()));
    context.insert(
        "tenantId".to_string(),
        Value::String(auth.tenant_id.as_str().to_string()),
    );
    context.insert("payload".to_string(), payload.clone());

    let result = match state.policies.evaluate(&state.gate_policy, &context, now) {
        Ok(result) => result,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(error_body("POLICY_NOT_FOUND", &err.to_string())),
            );
        }
    };
    let redacted = state.redactor.redact(&Value::Object(context));
    state.audit.record(&AuditEvent::policy_evaluated(stage, result.passed, &result.reason, redacted));
    if !result.passed {
        return (
            StatusCode::FORBIDDEN,
            axum::Json(error_body("POLICY_REJECTED", &result.reason)),
        );
    }

    let work_item_id = WorkItemId::new(format!("wi-{}", Uuid::new_v4()));
    let routed = route_with_blocking(state, work_item_id, workflow_name, payload, mode, now);
    match routed {
        Ok(trace) => {
            if trace.status == ExecutionStatus::Halted {
                state.audit.record(&AuditEvent::dead_letter(
                    stage,
                    "dispatch retries exhausted; failed effects parked",
                ));
            }
            let response = OrchestrationResponse::from_trace(trace);
            match serde_json::to_value(&response) {
                Ok(body) => (StatusCode::OK, axum::Json(body)),
                Err(err) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(error_body("INTERNAL", &err.to_string())),
                ),
            }
        }
        Err(EngineError::CircuitTripped(err)) => {
            state.audit.record(&AuditEvent::circuit_tripped(stage, &err.to_string()));
            (
                StatusCode::TOO_MANY_REQUESTS,
                axum::Json(error_body("CIRCUIT_TRIPPED", &err.to_string())),
            )
        }
        Err(EngineError::UnknownWorkflow(name)) => (
            StatusCode::BAD_REQUEST,
            axum::Json(error_body("UNKNOWN_WORKFLOW", &format!("no effect rule for {name}"))),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(error_body("INTERNAL", &err.to_string())),
        ),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Authenticates a request and maps failures to an HTTP response.
fn authenticate(
    state: &GatewayState,
    headers: &HeaderMap,
    stage: &str,
) -> Result<AuthContext, (StatusCode, axum::Json<Value>)> {
    let auth_header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    match state.authority.validate_request(auth_header) {
        Ok(auth) => {
            state.audit.record(&AuditEvent::auth_allowed(stage, &auth));
            Ok(auth)
        }
        Err(err) => {
            state.audit.record(&AuditEvent::auth_denied(stage, &err));
            let status = match err {
                AuthError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                AuthError::Unauthorized(_) => StatusCode::FORBIDDEN,
            };
            let code = match err {
                AuthError::Unauthenticated(_) => "UNAUTHORIZED",
                AuthError::Unauthorized(_) => "FORBIDDEN",
            };
            Err((status, axum::Json(error_body(code, &err.to_string()))))
        }
    }
}

/// Parses a request body under the size limit.
fn parse_body(
    state: &GatewayState,
    bytes: &Bytes,
) -> Result<Value, (StatusCode, axum::Json<Value>)> {
    if bytes.len() > state.max_body_bytes {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            axum::Json(error_body("PAYLOAD_TOO_LARGE", "request body exceeds size limit")),
        ));
    }
    serde_json::from_slice(bytes).map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            axum::Json(error_body("BAD_REQUEST", &format!("invalid json: {err}"))),
        )
    })
}

/// Routes into the engine, shifting to a blocking context when available.
fn route_with_blocking(
    state: &GatewayState,
    work_item_id: WorkItemId,
    workflow_name: &str,
    payload: &Value,
    mode: ExecutionMode,
    now: Timestamp,
) -> Result<ExecutionTrace, EngineError> {
    let route = || match mode {
        ExecutionMode::Shadow => {
            state.engine.route_shadow(work_item_id.clone(), workflow_name, payload, now)
        }
        ExecutionMode::Live => {
            state.engine.route_live(work_item_id.clone(), workflow_name, payload, now)
        }
    };
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(route)
        }
        _ => route(),
    }
}

/// Reads the system clock as epoch milliseconds.
fn current_time() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
    Timestamp::from_unix_millis(millis)
}
