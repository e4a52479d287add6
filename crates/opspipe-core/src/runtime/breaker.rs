// crates/opspipe-core/src/runtime/breaker.rs
// ============================================================================
// Module: Circuit Breaker
// Description: Per-target sliding-window execution rate limiter.
// Purpose: Halt dispatch toward a target that exceeds its execution budget.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The breaker records an execution timestamp per target system and refuses
//! further executions once a target accumulates more than the configured
//! count inside the sliding window. The check-and-record step is atomic per
//! target: under concurrency, at most `max_executions_per_window` admissions
//! can land inside any one window. Expired timestamps are pruned lazily on
//! each check; no background task runs. Distinct targets never influence one
//! another.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use thiserror::Error;

use crate::core::TargetSystem;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Circuit breaker failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BreakerError {
    /// The target has exhausted its execution budget for the current window.
    #[error("circuit tripped for target {target}: {count} executions in window")]
    Tripped {
        /// Target system that tripped.
        target: String,
        /// Executions currently recorded inside the window.
        count: usize,
    },
    /// Internal synchronization failure.
    #[error("breaker internal error: {0}")]
    Internal(String),
}

// ============================================================================
// SECTION: Breaker
// ============================================================================

/// Sliding-window circuit breaker keyed by target system.
pub struct CircuitBreaker {
    /// Maximum executions admitted per target inside one window.
    max_executions: usize,
    /// Window length in milliseconds.
    window_ms: i64,
    /// Per-target execution timestamps, each behind its own lock.
    ledgers: RwLock<BTreeMap<String, Arc<Mutex<Vec<i64>>>>>,
}

impl CircuitBreaker {
    /// Creates a breaker with the given budget and window.
    #[must_use]
    pub fn new(max_executions: usize, window_ms: i64) -> Self {
        Self {
            max_executions,
            window_ms,
            ledgers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Admits or refuses one execution against a target at time `now`.
    ///
    /// On admission the execution is recorded immediately, so a sequence of
    /// successful checks consumes budget even if the caller later fails.
    ///
    /// # Errors
    ///
    /// Returns [`BreakerError::Tripped`] when the target is over budget and
    /// [`BreakerError::Internal`] on lock poisoning.
    pub fn check_execution_tolerance(
        &self,
        target: &TargetSystem,
        now: Timestamp,
    ) -> Result<(), BreakerError> {
        let ledger = self.ledger_for(target.as_str())?;
        let mut stamps = ledger
            .lock()
            .map_err(|err| BreakerError::Internal(err.to_string()))?;
        let floor = now.as_unix_millis() - self.window_ms;
        stamps.retain(|stamp| *stamp > floor);
        if stamps.len() >= self.max_executions {
            return Err(BreakerError::Tripped {
                target: target.as_str().to_string(),
                count: stamps.len(),
            });
        }
        stamps.push(now.as_unix_millis());
        Ok(())
    }

    /// Returns the ledger for a target, creating it on first use.
    fn ledger_for(&self, target: &str) -> Result<Arc<Mutex<Vec<i64>>>, BreakerError> {
        {
            let ledgers = self
                .ledgers
                .read()
                .map_err(|err| BreakerError::Internal(err.to_string()))?;
            if let Some(ledger) = ledgers.get(target) {
                return Ok(Arc::clone(ledger));
            }
        }
        let mut ledgers = self
            .ledgers
            .write()
            .map_err(|err| BreakerError::Internal(err.to_string()))?;
        let ledger = ledgers
            .entry(target.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())));
        Ok(Arc::clone(ledger))
    }
}
