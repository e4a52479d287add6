// crates/opspipe-core/src/runtime/retry.rs
// ============================================================================
// Module: Retry Policy
// Description: Bounded exponential backoff with optional jitter.
// Purpose: Re-attempt transient dispatch failures a fixed number of times.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! An operation runs at most `max_retries + 1` times. Before each retry the
//! caller sleeps for `base_delay_ms * 2^(attempt - 1)` milliseconds, widened
//! by up to ten percent of random jitter when enabled. The final failure is
//! returned to the caller unchanged; this layer never substitutes its own
//! error type for the operation's.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;

use rand::Rng;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Retry schedule for a fallible operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries attempted after the initial call.
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,
    /// Whether to widen each delay by random jitter.
    pub use_jitter: bool,
}

impl RetryPolicy {
    /// Creates a retry policy.
    #[must_use]
    pub const fn new(max_retries: u32, base_delay_ms: u64, use_jitter: bool) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            use_jitter,
        }
    }

    /// Delay before retry number `attempt` (1-based), jitter included.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let base = self.base_delay_ms.saturating_mul(1_u64 << exponent);
        let jitter = if self.use_jitter && base > 0 {
            rand::thread_rng().gen_range(0..=base / 10)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter))
    }
}

/// Runs `operation` under the policy, sleeping between attempts.
///
/// # Errors
///
/// Returns the error from the final attempt once all retries are spent.
pub fn with_retry<T, E, F>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                thread::sleep(policy.delay_for_attempt(attempt));
            }
        }
    }
}
