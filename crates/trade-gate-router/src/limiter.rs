// trade-gate-router/src/limiter.rs
// ============================================================================
// Module: Token Bucket Rate Limiter
// Description: Call-rate accounting shared across concurrent executions.
// Purpose: Delay rather than drop calls that exceed the configured rate.
// Dependencies: trade-gate-core
// ============================================================================

//! ## Overview
//! The limiter is a token bucket over caller-supplied timestamps: refill and
//! consumption are pure arithmetic on the provided clock, so accounting is
//! deterministic in tests. A caller that finds the bucket empty receives the
//! delay it must wait; the token is reserved immediately (the balance goes
//! negative), which keeps concurrent waiters ordered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use trade_gate_core::Timestamp;

// ============================================================================
// SECTION: Bucket State
// ============================================================================

/// Mutable bucket accounting.
#[derive(Debug)]
struct BucketState {
    /// Available tokens; negative when calls are queued.
    tokens: f64,
    /// Clock value of the last refill.
    updated_at: Timestamp,
}

// ============================================================================
// SECTION: Limiter
// ============================================================================

/// Token-bucket rate limiter.
///
/// # Invariants
/// - `tokens` never exceeds the burst capacity.
/// - Each acquisition consumes exactly one token, even while waiting.
#[derive(Debug)]
pub struct RateLimiter {
    /// Sustained refill rate in tokens per second.
    rate_per_sec: f64,
    /// Bucket capacity.
    burst: f64,
    /// Shared bucket state.
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// Creates a full bucket with the given rate and burst capacity.
    ///
    /// Zero values are clamped to one to keep the limiter permissive rather
    /// than wedged.
    #[must_use]
    pub fn new(rate_per_sec: u32, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            rate_per_sec: f64::from(rate_per_sec.max(1)),
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                updated_at: Timestamp::from_unix_millis(0),
            }),
        }
    }

    /// Reserves one token and returns the delay in milliseconds to honor it.
    ///
    /// A return of zero means the call may proceed immediately.
    #[must_use]
    pub fn acquire_delay_ms(&self, now: Timestamp) -> u64 {
        let Ok(mut state) = self.state.lock() else {
            return 0;
        };
        let elapsed_ms = now.as_unix_millis().saturating_sub(state.updated_at.as_unix_millis());
        if elapsed_ms > 0 {
            #[allow(clippy::cast_precision_loss, reason = "elapsed spans fit in f64")]
            let refill = (elapsed_ms as f64 / 1000.0) * self.rate_per_sec;
            state.tokens = (state.tokens + refill).min(self.burst);
            state.updated_at = now;
        }
        state.tokens -= 1.0;
        if state.tokens >= 0.0 {
            return 0;
        }
        let wait_secs = -state.tokens / self.rate_per_sec;
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "wait is non-negative and bounded by the queue depth"
        )]
        {
            (wait_secs * 1000.0).ceil() as u64
        }
    }
}
