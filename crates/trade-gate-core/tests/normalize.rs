// trade-gate-core/tests/normalize.rs
// ============================================================================
// Module: Normalization Tests
// Description: Tests for timeframe and date normalization helpers.
// ============================================================================
//! ## Overview
//! Validates canonical timeframe mapping and deterministic date-range parsing
//! against a fixed reference instant.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use trade_gate_core::Timeframe;
use trade_gate_core::Timestamp;
use trade_gate_core::normalize::normalize_iso8601;
use trade_gate_core::normalize::normalize_timeframe;
use trade_gate_core::normalize::parse_date_range;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Fixed reference instant: 2025-08-05T12:00:00Z.
const NOW: Timestamp = Timestamp::from_unix_millis(1_754_395_200_000);

// ============================================================================
// SECTION: Timeframes
// ============================================================================

#[test]
fn timeframe_cues_map_to_canonical_values() {
    assert_eq!(normalize_timeframe("дневные"), Timeframe::D);
    assert_eq!(normalize_timeframe("часовой"), Timeframe::H1);
    assert_eq!(normalize_timeframe("4 часа"), Timeframe::H4);
    assert_eq!(normalize_timeframe("15 мин"), Timeframe::M15);
    assert_eq!(normalize_timeframe("m5"), Timeframe::M5);
    assert_eq!(normalize_timeframe("недельные"), Timeframe::W);
    assert_eq!(normalize_timeframe("TIME_FRAME_H1"), Timeframe::H1);
}

#[test]
fn unknown_timeframe_falls_back_to_daily() {
    assert_eq!(normalize_timeframe("что-то странное"), Timeframe::D);
    assert_eq!(normalize_timeframe(""), Timeframe::D);
}

// ============================================================================
// SECTION: Single Dates
// ============================================================================

#[test]
fn calendar_dates_normalize_to_rfc3339_utc() {
    assert_eq!(normalize_iso8601("2025-08-01", NOW).unwrap(), "2025-08-01T00:00:00Z");
    assert_eq!(normalize_iso8601("2025/08/01", NOW).unwrap(), "2025-08-01T00:00:00Z");
    assert_eq!(normalize_iso8601("2025-08-01 10:30", NOW).unwrap(), "2025-08-01T10:30:00Z");
    assert_eq!(normalize_iso8601("2025-08-01T10:30:15Z", NOW).unwrap(), "2025-08-01T10:30:15Z");
}

#[test]
fn natural_shortcuts_use_the_reference_instant() {
    assert_eq!(normalize_iso8601("сегодня", NOW).unwrap(), "2025-08-05T00:00:00Z");
    assert_eq!(normalize_iso8601("вчера", NOW).unwrap(), "2025-08-04T00:00:00Z");
    assert_eq!(normalize_iso8601("today", NOW).unwrap(), "2025-08-05T00:00:00Z");
}

#[test]
fn malformed_dates_are_rejected() {
    assert!(normalize_iso8601("когда-нибудь", NOW).is_none());
    assert!(normalize_iso8601("2025-13-01", NOW).is_none());
    assert!(normalize_iso8601("2025-08", NOW).is_none());
}

// ============================================================================
// SECTION: Date Ranges
// ============================================================================

#[test]
fn last_week_spans_seven_days_back() {
    let (start, end) = parse_date_range("за последнюю неделю", NOW).unwrap();
    assert_eq!(start, "2025-07-29T00:00:00Z");
    assert_eq!(end, "2025-08-05T12:00:00Z");
}

#[test]
fn last_quarter_uses_calendar_bounds() {
    let (start, end) = parse_date_range("за последний квартал", NOW).unwrap();
    assert_eq!(start, "2025-04-01T00:00:00Z");
    assert_eq!(end, "2025-06-30T23:59:59Z");
}

#[test]
fn month_with_year_spans_the_whole_month() {
    let (start, end) = parse_date_range("август 2025", NOW).unwrap();
    assert_eq!(start, "2025-08-01T00:00:00Z");
    assert_eq!(end, "2025-08-31T23:59:59Z");
}

#[test]
fn last_n_days_phrase_is_parsed() {
    let (start, end) = parse_date_range("за последние 10 дней", NOW).unwrap();
    assert_eq!(start, "2025-07-26T00:00:00Z");
    assert_eq!(end, "2025-08-05T12:00:00Z");
}

#[test]
fn plain_text_has_no_range() {
    assert!(parse_date_range("Какая цена Сбербанка?", NOW).is_none());
}
