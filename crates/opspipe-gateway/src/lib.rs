// crates/opspipe-gateway/src/lib.rs
// ============================================================================
// Module: OpsPipe Gateway
// Description: HTTP gateway for the OpsPipe execution spine.
// Purpose: Expose the firewall, schema gate, audit, dispatch, and server.
// Dependencies: opspipe-config, opspipe-core, axum, jsonwebtoken, jsonschema
// ============================================================================

//! ## Overview
//! The gateway crate is the outer surface of OpsPipe: it authenticates
//! callers, validates request bodies, enforces tenant isolation, and routes
//! admitted workflows into the core execution engine.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod dispatch;
pub mod schema;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::AuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use auth::AuthContext;
pub use auth::AuthError;
pub use auth::JwtAuthority;
pub use auth::Role;
pub use dispatch::LoggingDispatcher;
pub use dispatch::SharedDispatcher;
pub use schema::SchemaGate;
pub use schema::SchemaViolation;
pub use server::GatewayError;
pub use server::GatewayServer;
