// crates/opspipe-gateway/src/auth.rs
// ============================================================================
// Module: Gateway Authn/Authz
// Description: JWT firewall and role enforcement for orchestration routes.
// Purpose: Provide strict, fail-closed auth for every inbound request.
// Dependencies: jsonwebtoken, opspipe-core, serde, sha2
// ============================================================================

//! ## Overview
//! Every route sits behind the JWT firewall: a request with a missing,
//! malformed, expired, or incomplete token is rejected before any other
//! stage runs. Tokens are HMAC-signed with the configured secret and must
//! carry subject, tenant, role, and email claims; each missing claim is
//! reported individually so operators can fix tokens without guessing.
//! Role checks are fail-closed: an unrecognized role string authenticates
//! but authorizes nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;
use jsonwebtoken::decode;
use opspipe_core::OperatorId;
use opspipe_core::TenantId;
use serde::Deserialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted authorization header length in bytes.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Caller roles recognized by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Full access including the trace listing.
    Admin,
    /// May submit shadow and live requests.
    Operator,
    /// May submit shadow requests only.
    ReadOnly,
}

impl Role {
    /// Parses a role claim. Unknown strings yield no role.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "operator" => Some(Self::Operator),
            "read_only" => Some(Self::ReadOnly),
            _ => None,
        }
    }

    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
            Self::ReadOnly => "read_only",
        }
    }

    /// Returns true when this role may submit live requests.
    #[must_use]
    pub const fn can_execute_live(self) -> bool {
        matches!(self, Self::Admin | Self::Operator)
    }

    /// Returns true when this role may read the trace listing.
    #[must_use]
    pub const fn can_read_traces(self) -> bool {
        matches!(self, Self::Admin)
    }
}

// ============================================================================
// SECTION: Auth Context
// ============================================================================

/// Authenticated caller context.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Tenant the caller belongs to.
    pub tenant_id: TenantId,
    /// Operator identity from the subject claim.
    pub operator_id: OperatorId,
    /// Caller role.
    pub role: Role,
    /// Caller email from the token.
    pub email: String,
    /// Token fingerprint (sha256) for audit records.
    pub token_fingerprint: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication or authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or invalid authentication.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Caller is authenticated but not authorized.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

/// Configuration errors raised while building the authority.
#[derive(Debug, Error)]
pub enum AuthoritySetupError {
    /// The signing secret is empty.
    #[error("signing secret must not be empty")]
    EmptySecret,
}

// ============================================================================
// SECTION: Claims
// ============================================================================

/// JWT claims carried by gateway tokens.
///
/// Every claim is optional at the parse layer so each absence can be
/// reported precisely; the authority enforces presence afterwards.
#[derive(Debug, Deserialize)]
struct Claims {
    /// Operator identity.
    sub: Option<String>,
    /// Tenant the token is scoped to.
    tenant: Option<String>,
    /// Role claim.
    role: Option<String>,
    /// Caller email.
    email: Option<String>,
    /// Expiry as seconds since the epoch, validated by the decoder.
    #[allow(dead_code, reason = "read by the signature validator, not by us")]
    exp: i64,
}

// ============================================================================
// SECTION: Authority
// ============================================================================

/// JWT validation authority for the gateway.
pub struct JwtAuthority {
    /// HMAC decoding key derived from the signing secret.
    decoding_key: DecodingKey,
    /// Decoder settings (HS256, expiry enforced).
    validation: Validation,
}

impl JwtAuthority {
    /// Builds an authority from the signing secret.
    ///
    /// # Errors
    ///
    /// Returns [`AuthoritySetupError::EmptySecret`] for an empty secret; the
    /// gateway must refuse to boot rather than accept unsigned tokens.
    pub fn new(signing_secret: &str) -> Result<Self, AuthoritySetupError> {
        if signing_secret.trim().is_empty() {
            return Err(AuthoritySetupError::EmptySecret);
        }
        Ok(Self {
            decoding_key: DecodingKey::from_secret(signing_secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        })
    }

    /// Validates the authorization header and returns the caller context.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] for a missing or oversized
    /// header, a malformed or expired token, or a token missing any
    /// required claim.
    pub fn validate_request(&self, auth_header: Option<&str>) -> Result<AuthContext, AuthError> {
        let token = parse_bearer_token(auth_header)?;
        let data = decode::<Claims>(&token, &self.decoding_key, &self.validation)
            .map_err(|err| AuthError::Unauthenticated(format!("invalid token: {err}")))?;
        let claims = data.claims;
        let sub = require_claim(claims.sub, "sub")?;
        let tenant = require_claim(claims.tenant, "tenant")?;
        let role_claim = require_claim(claims.role, "role")?;
        let email = require_claim(claims.email, "email")?;
        let role = Role::parse(&role_claim)
            .ok_or_else(|| AuthError::Unauthenticated(format!("unknown role: {role_claim}")))?;
        Ok(AuthContext {
            tenant_id: TenantId::new(tenant),
            operator_id: OperatorId::new(sub),
            role,
            email,
            token_fingerprint: fingerprint(&token),
        })
    }
}

/// Requires a live-execution capable role.
///
/// # Errors
///
/// Returns [`AuthError::Unauthorized`] when the role may not execute live.
pub fn require_live_role(auth: &AuthContext) -> Result<(), AuthError> {
    if auth.role.can_execute_live() {
        Ok(())
    } else {
        Err(AuthError::Unauthorized(format!(
            "role {} may not execute live workflows",
            auth.role.label()
        )))
    }
}

/// Requires trace-listing access.
///
/// # Errors
///
/// Returns [`AuthError::Unauthorized`] when the role may not read traces.
pub fn require_trace_role(auth: &AuthContext) -> Result<(), AuthError> {
    if auth.role.can_read_traces() {
        Ok(())
    } else {
        Err(AuthError::Unauthorized(format!(
            "role {} may not read execution traces",
            auth.role.label()
        )))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts a bearer token from the authorization header.
fn parse_bearer_token(auth_header: Option<&str>) -> Result<String, AuthError> {
    let header = auth_header
        .ok_or_else(|| AuthError::Unauthenticated("missing authorization".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

/// Enforces presence of a claim, naming it in the error.
fn require_claim(value: Option<String>, name: &str) -> Result<String, AuthError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AuthError::Unauthenticated(format!("token missing claim: {name}"))),
    }
}

/// Hashes a token for audit records.
fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
