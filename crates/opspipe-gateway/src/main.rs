// crates/opspipe-gateway/src/main.rs
// ============================================================================
// Module: OpsPipe Gateway Entry Point
// Description: Boots the gateway from configuration and serves requests.
// Purpose: Provide the production binary for the OpsPipe HTTP surface.
// Dependencies: opspipe-config, opspipe-gateway, tokio
// ============================================================================

//! ## Overview
//! Loads configuration (explicit `OPSPIPE_CONFIG` override or `opspipe.toml`
//! in the working directory), builds the gateway, and serves until the
//! listener fails. Any boot failure is fatal; the gateway never starts in a
//! degraded mode.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::process::ExitCode;

use opspipe_config::OpspipeConfig;
use opspipe_gateway::GatewayServer;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Gateway entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "opspipe-gateway: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration and serves the gateway.
async fn run() -> Result<(), String> {
    let config = OpspipeConfig::load(None).map_err(|err| err.to_string())?;
    let server = GatewayServer::from_config(config).map_err(|err| err.to_string())?;
    server.serve().await.map_err(|err| err.to_string())
}
