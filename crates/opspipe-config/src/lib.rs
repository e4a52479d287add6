// crates/opspipe-config/src/lib.rs
// ============================================================================
// Module: OpsPipe Config
// Description: Configuration crate for the OpsPipe gateway and runtime.
// Purpose: Expose strict TOML configuration loading.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Strict configuration loading for OpsPipe. All sections carry safe
//! defaults except authentication, which must be configured explicitly.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuthConfig;
pub use config::BreakerConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::DispatchConfig;
pub use config::DispatchMode;
pub use config::IdempotencyConfig;
pub use config::OpspipeConfig;
pub use config::PolicyConfig;
pub use config::RedactionConfig;
pub use config::RetryConfig;
pub use config::ServerConfig;
