//! Partial-parse derivations for charging-session records.
//!
//! Every typed or derived value is an `Option`. A value that fails to parse
//! becomes `None` instead of an error, and a derivation with an absent input
//! is itself absent. `utilization_status` is the one exception: it is always
//! present and treats an absent duration as "not long".

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

/// Sessions strictly longer than this many seconds are `LONG_SESSION`.
pub const LONG_SESSION_THRESHOLD_SECS: i64 = 3600;

// Offsets are normalized to UTC.
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
];

// Naive timestamps are read as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a raw timestamp string into a UTC instant.
///
/// Accepts RFC 3339, `YYYY-MM-DD[T| ]HH:MM[:SS[.fff]]` with an optional
/// offset, and a bare `YYYY-MM-DD` (midnight). Anything else is `None`.
pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let value = raw?.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a raw numeric string into a float. Surrounding whitespace is ignored.
pub fn parse_float(raw: Option<&str>) -> Option<f64> {
    let value = raw?.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok()
}

/// Whole seconds between two instants, each truncated to the second first.
///
/// Negative when `end` precedes `start`.
pub fn session_duration_secs(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Option<i64> {
    let start = start?;
    let end = end?;
    Some(end.timestamp() - start.timestamp())
}

/// UTC calendar date of the session start.
pub fn session_date(start: Option<DateTime<Utc>>) -> Option<NaiveDate> {
    start.map(|dt| dt.date_naive())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UtilizationStatus {
    LongSession,
    ShortSession,
}

impl UtilizationStatus {
    /// Strictly greater than the threshold is long; an absent duration is short.
    pub fn classify(duration_secs: Option<i64>) -> Self {
        match duration_secs {
            Some(secs) if secs > LONG_SESSION_THRESHOLD_SECS => Self::LongSession,
            _ => Self::ShortSession,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LongSession => "LONG_SESSION",
            Self::ShortSession => "SHORT_SESSION",
        }
    }
}

impl fmt::Display for UtilizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All typed and derived values for one raw row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedSession {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub energy_delivered_kwh: Option<f64>,
    pub session_duration_sec: Option<i64>,
    pub date: Option<NaiveDate>,
    pub utilization_status: UtilizationStatus,
}

impl DerivedSession {
    /// Casts first, then duration and date, then status.
    pub fn from_raw(start_time: Option<&str>, end_time: Option<&str>, energy: Option<&str>) -> Self {
        let start_time = parse_timestamp(start_time);
        let end_time = parse_timestamp(end_time);
        let energy_delivered_kwh = parse_float(energy);
        let session_duration_sec = session_duration_secs(start_time, end_time);
        let date = session_date(start_time);
        let utilization_status = UtilizationStatus::classify(session_duration_sec);

        Self {
            start_time,
            end_time,
            energy_delivered_kwh,
            session_duration_sec,
            date,
            utilization_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn parses_common_timestamp_shapes() {
        let expected = utc(2024, 1, 1, 10, 0, 0);
        assert_eq!(parse_timestamp(Some("2024-01-01T10:00:00")), Some(expected));
        assert_eq!(parse_timestamp(Some("2024-01-01 10:00:00")), Some(expected));
        assert_eq!(parse_timestamp(Some("2024-01-01T10:00:00Z")), Some(expected));
        assert_eq!(parse_timestamp(Some("2024-01-01T10:00")), Some(expected));
        assert_eq!(parse_timestamp(Some("  2024-01-01T10:00:00  ")), Some(expected));
        assert_eq!(
            parse_timestamp(Some("2024-01-01")),
            Some(utc(2024, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        assert_eq!(
            parse_timestamp(Some("2024-01-01T12:00:00+02:00")),
            Some(utc(2024, 1, 1, 10, 0, 0))
        );
        assert_eq!(
            parse_timestamp(Some("2024-01-01 01:30:00+0300")),
            Some(utc(2023, 12, 31, 22, 30, 0))
        );
    }

    #[test]
    fn unparsable_timestamps_are_absent() {
        assert_eq!(parse_timestamp(None), None);
        assert_eq!(parse_timestamp(Some("")), None);
        assert_eq!(parse_timestamp(Some("yesterday")), None);
        assert_eq!(parse_timestamp(Some("2024-13-01T00:00:00")), None);
    }

    #[test]
    fn parse_float_degrades_to_absent() {
        assert_eq!(parse_float(Some("12.5")), Some(12.5));
        assert_eq!(parse_float(Some(" 3 ")), Some(3.0));
        assert_eq!(parse_float(Some("1e3")), Some(1000.0));
        assert_eq!(parse_float(Some("N/A")), None);
        assert_eq!(parse_float(Some("12.5kWh")), None);
        assert_eq!(parse_float(Some("")), None);
        assert_eq!(parse_float(None), None);
    }

    #[test]
    fn duration_truncates_fractional_seconds() {
        let start = parse_timestamp(Some("2024-01-01T10:00:00.900"));
        let end = parse_timestamp(Some("2024-01-01T10:00:10.100"));
        assert_eq!(session_duration_secs(start, end), Some(10));
    }

    #[test]
    fn duration_propagates_absence() {
        let t = Some(utc(2024, 1, 1, 10, 0, 0));
        assert_eq!(session_duration_secs(t, None), None);
        assert_eq!(session_duration_secs(None, t), None);
        assert_eq!(session_duration_secs(None, None), None);
    }

    #[test]
    fn duration_can_be_negative() {
        let start = Some(utc(2024, 1, 1, 11, 0, 0));
        let end = Some(utc(2024, 1, 1, 10, 0, 0));
        assert_eq!(session_duration_secs(start, end), Some(-3600));
    }

    #[test]
    fn classification_threshold_is_strict() {
        assert_eq!(
            UtilizationStatus::classify(Some(3600)),
            UtilizationStatus::ShortSession
        );
        assert_eq!(
            UtilizationStatus::classify(Some(3601)),
            UtilizationStatus::LongSession
        );
        assert_eq!(
            UtilizationStatus::classify(None),
            UtilizationStatus::ShortSession
        );
        assert_eq!(
            UtilizationStatus::classify(Some(-7200)),
            UtilizationStatus::ShortSession
        );
    }

    #[test]
    fn derived_session_matches_reference_row() {
        let derived = DerivedSession::from_raw(
            Some("2024-01-01T10:00:00"),
            Some("2024-01-01T11:30:00"),
            Some("12.5"),
        );
        assert_eq!(derived.session_duration_sec, Some(5400));
        assert_eq!(derived.utilization_status, UtilizationStatus::LongSession);
        assert_eq!(derived.date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(derived.energy_delivered_kwh, Some(12.5));
    }

    #[test]
    fn bad_energy_does_not_affect_other_columns() {
        let derived = DerivedSession::from_raw(
            Some("2024-01-01T10:00:00"),
            Some("2024-01-01T10:20:00"),
            Some("N/A"),
        );
        assert_eq!(derived.energy_delivered_kwh, None);
        assert_eq!(derived.session_duration_sec, Some(1200));
        assert_eq!(derived.utilization_status, UtilizationStatus::ShortSession);
        assert!(derived.date.is_some());
    }

    #[test]
    fn missing_start_clears_date_and_duration() {
        let derived = DerivedSession::from_raw(None, Some("2024-01-01T11:30:00"), Some("1"));
        assert_eq!(derived.date, None);
        assert_eq!(derived.session_duration_sec, None);
        assert_eq!(derived.utilization_status, UtilizationStatus::ShortSession);
        assert_eq!(derived.utilization_status.to_string(), "SHORT_SESSION");
    }
}
