// trade-gate-core/src/normalize.rs
// ============================================================================
// Module: Trade Gate Value Normalization
// Description: Timeframe, date, and date-range normalization helpers.
// Purpose: Turn natural-language value fragments into canonical wire forms.
// Dependencies: crate::core::time, serde, time
// ============================================================================

//! ## Overview
//! Normalization maps Russian and English value fragments onto the canonical
//! forms the trading backend expects: `TIME_FRAME_*` enums and RFC 3339 UTC
//! date-times. All computations derive from a caller-supplied `now` timestamp,
//! never from the wall clock, so normalization stays deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use time::Duration;
use time::Month;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::Time;
use time::format_description::well_known::Rfc3339;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Timeframes
// ============================================================================

/// Candle timeframe accepted by the bars endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Timeframe {
    /// One-minute candles.
    M1,
    /// Five-minute candles.
    M5,
    /// Fifteen-minute candles.
    M15,
    /// Thirty-minute candles.
    M30,
    /// One-hour candles.
    H1,
    /// Four-hour candles.
    H4,
    /// Daily candles.
    #[default]
    D,
    /// Weekly candles.
    W,
    /// Monthly candles.
    Mn,
}

impl Timeframe {
    /// Returns the canonical wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "TIME_FRAME_M1",
            Self::M5 => "TIME_FRAME_M5",
            Self::M15 => "TIME_FRAME_M15",
            Self::M30 => "TIME_FRAME_M30",
            Self::H1 => "TIME_FRAME_H1",
            Self::H4 => "TIME_FRAME_H4",
            Self::D => "TIME_FRAME_D",
            Self::W => "TIME_FRAME_W",
            Self::Mn => "TIME_FRAME_MN",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timeframe cue table in match priority order.
const TIMEFRAME_CUES: &[(Timeframe, &[&str])] = &[
    (Timeframe::M30, &["30m", "m30", "30 мин"]),
    (Timeframe::M15, &["15m", "m15", "15 мин"]),
    (Timeframe::M5, &["5m", "m5", "5 мин"]),
    (Timeframe::M1, &["1m", "m1", "минутн", "1 мин"]),
    (Timeframe::H4, &["4h", "h4", "4 часа"]),
    (Timeframe::H1, &["1h", "h1", "часов", "час"]),
    (Timeframe::W, &["1w", "недел", "нед"]),
    (Timeframe::Mn, &["mn", "месяц", "месячн"]),
    (Timeframe::D, &["1d", "day", "днев", "дни"]),
];

/// Normalizes a natural timeframe fragment to a canonical value.
///
/// Unrecognized input falls back to daily candles, matching the backend
/// default.
#[must_use]
pub fn normalize_timeframe(natural: &str) -> Timeframe {
    let lower = natural.trim().to_lowercase();
    if matches!(lower.as_str(), "d" | "w") {
        return if lower == "w" { Timeframe::W } else { Timeframe::D };
    }
    if lower.starts_with("time_frame_") {
        for (frame, _) in TIMEFRAME_CUES {
            if lower.eq_ignore_ascii_case(frame.as_str()) {
                return *frame;
            }
        }
    }
    for (frame, cues) in TIMEFRAME_CUES {
        if cues.iter().any(|cue| lower.contains(cue)) {
            return *frame;
        }
    }
    Timeframe::D
}

// ============================================================================
// SECTION: RFC 3339 Formatting
// ============================================================================

/// Fallback rendering used when a timestamp is outside the representable range.
const EPOCH_RFC3339: &str = "1970-01-01T00:00:00Z";

/// Formats a timestamp as an RFC 3339 UTC string with second precision.
#[must_use]
pub fn format_rfc3339(ts: Timestamp) -> String {
    ts.to_datetime_utc()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| EPOCH_RFC3339.to_string())
}

/// Formats a UTC date-time as an RFC 3339 string with second precision.
fn format_datetime(dt: OffsetDateTime) -> String {
    dt.replace_nanosecond(0)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| EPOCH_RFC3339.to_string())
}

// ============================================================================
// SECTION: Date Normalization
// ============================================================================

/// Normalizes a single date fragment to RFC 3339 UTC.
///
/// Accepts the natural-language shortcuts "сегодня"/"today" and
/// "вчера"/"yesterday", plus `YYYY-MM-DD`, `YYYY/MM/DD`, and those forms with
/// an `HH:MM[:SS]` time component or a trailing `Z`. Returns `None` when the
/// fragment cannot be interpreted, so callers surface an invalid-parameter
/// outcome instead of guessing.
#[must_use]
pub fn normalize_iso8601(raw: &str, now: Timestamp) -> Option<String> {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();
    let now_dt = now.to_datetime_utc()?;
    if matches!(lower.as_str(), "сегодня" | "today") {
        return Some(format_datetime(day_start(now_dt)));
    }
    if matches!(lower.as_str(), "вчера" | "yesterday") {
        return Some(format_datetime(day_start(now_dt - Duration::days(1))));
    }
    parse_components(trimmed).map(format_datetime)
}

/// Parses `YYYY-MM-DD[ HH:MM[:SS]]` (slash-separated dates accepted) as UTC.
fn parse_components(raw: &str) -> Option<OffsetDateTime> {
    let cleaned = raw.trim_end_matches('Z');
    let (date_part, time_part) = match cleaned.split_once([' ', 'T']) {
        Some((date, time)) => (date, Some(time)),
        None => (cleaned, None),
    };

    let mut fields = date_part.split(['-', '/']);
    let year: i32 = fields.next()?.parse().ok()?;
    let month: u8 = fields.next()?.parse().ok()?;
    let day: u8 = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    let date = Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()?;

    let time = match time_part {
        None => Time::MIDNIGHT,
        Some(fragment) => {
            let mut parts = fragment.split(':');
            let hour: u8 = parts.next()?.parse().ok()?;
            let minute: u8 = parts.next()?.parse().ok()?;
            let second: u8 = match parts.next() {
                None => 0,
                Some(second) => second.parse().ok()?,
            };
            if parts.next().is_some() {
                return None;
            }
            Time::from_hms(hour, minute, second).ok()?
        }
    };

    Some(PrimitiveDateTime::new(date, time).assume_utc())
}

// ============================================================================
// SECTION: Date Ranges
// ============================================================================

/// Russian month-name prefixes mapped to month numbers.
const RU_MONTHS: &[(&str, u8)] = &[
    ("январ", 1),
    ("феврал", 2),
    ("март", 3),
    ("апрел", 4),
    ("мая", 5),
    ("май", 5),
    ("июн", 6),
    ("июл", 7),
    ("август", 8),
    ("сентябр", 9),
    ("октябр", 10),
    ("ноябр", 11),
    ("декабр", 12),
];

/// Parses Russian natural phrases into an RFC 3339 start/end pair.
///
/// Handles "за последнюю неделю", "за последний квартал", "за полгода",
/// "последние N дней", and month-plus-year phrases such as "август 2025".
#[must_use]
pub fn parse_date_range(text: &str, now: Timestamp) -> Option<(String, String)> {
    let lower = text.to_lowercase();
    let now_dt = now.to_datetime_utc()?;

    if lower.contains("последн") && lower.contains("недел") {
        let start = day_start(now_dt - Duration::days(7));
        return Some((format_datetime(start), format_datetime(now_dt)));
    }

    if lower.contains("последн") && lower.contains("квартал") {
        let (start, end) = previous_quarter(now_dt);
        return Some((format_datetime(start), format_datetime(end)));
    }

    if lower.contains("полгод") || lower.contains("пол-года") {
        let start = day_start(now_dt - Duration::days(182));
        return Some((format_datetime(start), format_datetime(now_dt)));
    }

    if let Some(days) = parse_last_days(&lower) {
        let start = day_start(now_dt - Duration::days(i64::from(days)));
        return Some((format_datetime(start), format_datetime(now_dt)));
    }

    if let Some((year, month)) = parse_month_year(&lower) {
        let start = month_start(year, month)?;
        let end = end_of_month(year, month)?;
        return Some((format_datetime(start), format_datetime(end)));
    }

    None
}

/// Extracts N from "последние N дней" phrases.
fn parse_last_days(lower: &str) -> Option<u32> {
    if !lower.contains("последн") {
        return None;
    }
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    for window in tokens.windows(2) {
        if let [count, unit] = window
            && unit.starts_with("дн")
            && let Ok(days) = count.parse::<u32>()
        {
            return Some(days);
        }
    }
    None
}

/// Extracts a (year, month) pair from phrases such as "август 2025".
fn parse_month_year(lower: &str) -> Option<(i32, u8)> {
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    for window in tokens.windows(2) {
        if let [month_token, year_token] = window
            && let Some((_, month)) =
                RU_MONTHS.iter().find(|(prefix, _)| month_token.starts_with(prefix))
            && year_token.len() == 4
            && let Ok(year) = year_token.parse::<i32>()
        {
            return Some((year, *month));
        }
    }
    None
}

// ============================================================================
// SECTION: Calendar Helpers
// ============================================================================

/// Returns midnight UTC of the given date-time's day.
fn day_start(dt: OffsetDateTime) -> OffsetDateTime {
    dt.replace_time(Time::MIDNIGHT)
}

/// Returns the first instant of the given month.
fn month_start(year: i32, month: u8) -> Option<OffsetDateTime> {
    let date = Date::from_calendar_date(year, Month::try_from(month).ok()?, 1).ok()?;
    Some(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc())
}

/// Returns the last second of the given month.
fn end_of_month(year: i32, month: u8) -> Option<OffsetDateTime> {
    let next = if month == 12 {
        month_start(year + 1, 1)?
    } else {
        month_start(year, month + 1)?
    };
    Some(next - Duration::seconds(1))
}

/// Returns the bounds of the quarter preceding the given instant.
fn previous_quarter(now_dt: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
    let month = u8::from(now_dt.month());
    let current_quarter = (month - 1) / 3;
    let (year, quarter) = if current_quarter == 0 {
        (now_dt.year() - 1, 3)
    } else {
        (now_dt.year(), current_quarter - 1)
    };
    let start_month = quarter * 3 + 1;
    let end_month = start_month + 2;
    let start = month_start(year, start_month).unwrap_or(now_dt);
    let end = end_of_month(year, end_month).unwrap_or(now_dt);
    (start, end)
}
