// trade-gate-core/src/core/time.rs
// ============================================================================
// Module: Trade Gate Time Model
// Description: Canonical timestamp representation for the resolution pipeline.
// Purpose: Provide deterministic, replayable time values across pipeline records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Trade Gate uses explicit time values supplied by callers to keep resolution
//! and confirmation expiry deterministic. The core never reads wall-clock time
//! directly; hosts mint timestamps at their boundary and thread them through
//! [`Timestamp`] values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp as unix epoch milliseconds.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads
///   wall-clock time. Monotonicity is a caller responsibility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns a timestamp shifted forward by the given milliseconds.
    #[must_use]
    pub const fn saturating_add_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis as i64))
    }

    /// Returns a timestamp shifted backward by the given number of days.
    #[must_use]
    pub const fn saturating_sub_days(self, days: u32) -> Self {
        Self(self.0.saturating_sub(days as i64 * MILLIS_PER_DAY))
    }

    /// Converts the timestamp into a UTC date-time.
    #[must_use]
    pub fn to_datetime_utc(self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.0.div_euclid(1000)).ok()
    }
}

/// Milliseconds per day used for date arithmetic.
const MILLIS_PER_DAY: i64 = 86_400_000;
