// crates/opspipe-core/src/core/time.rs
// ============================================================================
// Module: OpsPipe Time Model
// Description: Canonical timestamp representation for envelopes and records.
// Purpose: Provide deterministic, replayable time values across OpsPipe records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! OpsPipe uses explicit time values embedded in envelopes and records to keep
//! replay deterministic. The core never reads wall-clock time directly; hosts
//! must supply timestamps at every entry point. TTL and window arithmetic is
//! performed on unix-epoch milliseconds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in OpsPipe envelopes, traces, and locks.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix-epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix-epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns a timestamp advanced by the given number of milliseconds.
    #[must_use]
    pub const fn saturating_add_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Returns the number of milliseconds between `self` and an earlier timestamp.
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Returns true when `self` is strictly before `other`.
    #[must_use]
    pub const fn is_before(self, other: Self) -> bool {
        self.0 < other.0
    }
}
