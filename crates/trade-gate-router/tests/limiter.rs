// trade-gate-router/tests/limiter.rs
// ============================================================================
// Module: Rate Limiter Tests
// Description: Tests for token-bucket accounting and delay computation.
// ============================================================================
//! ## Overview
//! Validates bucket refill, burst consumption, and the delays handed to
//! callers that exceed the sustained rate, all against explicit clocks.

use trade_gate_core::Timestamp;
use trade_gate_router::RateLimiter;

/// Fixed reference instant: 2025-08-05T12:00:00Z.
const NOW: Timestamp = Timestamp::from_unix_millis(1_754_395_200_000);

// ============================================================================
// SECTION: Burst Consumption
// ============================================================================

#[test]
fn burst_capacity_is_served_without_delay() {
    let limiter = RateLimiter::new(1, 3);
    assert_eq!(limiter.acquire_delay_ms(NOW), 0);
    assert_eq!(limiter.acquire_delay_ms(NOW), 0);
    assert_eq!(limiter.acquire_delay_ms(NOW), 0);
}

#[test]
fn exhausted_bucket_delays_instead_of_dropping() {
    let limiter = RateLimiter::new(1, 2);
    assert_eq!(limiter.acquire_delay_ms(NOW), 0);
    assert_eq!(limiter.acquire_delay_ms(NOW), 0);
    // One token per second: the third caller waits a full second, the
    // fourth queues behind it.
    assert_eq!(limiter.acquire_delay_ms(NOW), 1000);
    assert_eq!(limiter.acquire_delay_ms(NOW), 2000);
}

// ============================================================================
// SECTION: Refill
// ============================================================================

#[test]
fn elapsed_time_refills_the_bucket() {
    let limiter = RateLimiter::new(2, 2);
    assert_eq!(limiter.acquire_delay_ms(NOW), 0);
    assert_eq!(limiter.acquire_delay_ms(NOW), 0);

    // Two tokens per second: half a second refills one token.
    let later = NOW.saturating_add_millis(500);
    assert_eq!(limiter.acquire_delay_ms(later), 0);
    assert!(limiter.acquire_delay_ms(later) > 0);
}

#[test]
fn refill_never_exceeds_the_burst_capacity() {
    let limiter = RateLimiter::new(10, 2);
    let later = NOW.saturating_add_millis(60_000);
    assert_eq!(limiter.acquire_delay_ms(later), 0);
    assert_eq!(limiter.acquire_delay_ms(later), 0);
    assert!(limiter.acquire_delay_ms(later) > 0);
}
