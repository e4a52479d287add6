// crates/opspipe-gateway/src/dispatch.rs
// ============================================================================
// Module: Gateway Dispatch
// Description: Dispatcher implementations selectable through configuration.
// Purpose: Provide the logging dispatcher and the shared dispatcher handle
//          the execution engine runs over.
// Dependencies: opspipe-core, serde_json
// ============================================================================

//! ## Overview
//! The gateway currently ships one dispatcher: the logging dispatcher, which
//! records each effect as a JSON line on stderr and reports success. It is
//! the safe default for environments where live dispatch targets are not yet
//! wired up. The shared handle lets the engine stay generic while the server
//! picks the implementation at boot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Arc;

use opspipe_core::ComputedEffect;
use opspipe_core::DispatchError;
use opspipe_core::DispatchReceipt;
use opspipe_core::Dispatcher;
use serde_json::json;

// ============================================================================
// SECTION: Logging Dispatcher
// ============================================================================

/// Dispatcher that logs each effect and reports success.
pub struct LoggingDispatcher;

impl Dispatcher for LoggingDispatcher {
    fn dispatch(&self, effect: &ComputedEffect) -> Result<DispatchReceipt, DispatchError> {
        let line = json!({
            "event": "effect_dispatch",
            "target": effect.target.as_str(),
            "action": effect.action,
        });
        let payload = serde_json::to_string(&line)
            .map_err(|err| DispatchError::DispatchFailed(err.to_string()))?;
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "{payload}")
            .map_err(|err| DispatchError::DispatchFailed(err.to_string()))?;
        Ok(DispatchReceipt {
            target: effect.target.clone(),
            reference: None,
        })
    }
}

// ============================================================================
// SECTION: Shared Handle
// ============================================================================

/// Dispatcher handle shared between the server and the engine.
#[derive(Clone)]
pub struct SharedDispatcher {
    /// Boxed dispatcher implementation.
    inner: Arc<dyn Dispatcher>,
}

impl SharedDispatcher {
    /// Wraps a dispatcher implementation.
    #[must_use]
    pub fn from_dispatcher(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            inner: dispatcher,
        }
    }
}

impl Dispatcher for SharedDispatcher {
    fn dispatch(&self, effect: &ComputedEffect) -> Result<DispatchReceipt, DispatchError> {
        self.inner.dispatch(effect)
    }
}
