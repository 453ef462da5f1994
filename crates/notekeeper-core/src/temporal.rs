//! Local-time rendering and date parsing.
//!
//! Timestamps are stored in UTC and shown at a fixed display offset
//! (`DISPLAY_UTC_OFFSET_HOURS`). Dates typed by users are interpreted in that
//! same offset.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

use crate::error::{Error, Result};

/// Date format accepted from users (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date-time format used in bot replies and exports.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Build a fixed offset from whole hours, falling back to UTC when out of range.
pub fn offset_from_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Render a UTC timestamp as local `YYYY-MM-DD HH:MM`.
pub fn format_datetime(ts: DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format(DATETIME_FORMAT).to_string()
}

/// Render a UTC timestamp as a local `YYYY-MM-DD` date.
pub fn format_date(ts: DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format(DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| Error::InvalidInput(format!("invalid date: {}", input)))
}

/// Local midnight of `date`, as a UTC instant.
pub fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    match offset.from_local_datetime(&local).single() {
        Some(dt) => dt.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&local),
    }
}

/// Today's date at the display offset.
pub fn today(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_datetime_applies_offset() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 22, 30, 0).unwrap();
        assert_eq!(format_datetime(ts, offset_from_hours(3)), "2026-03-02 01:30");
        assert_eq!(format_datetime(ts, offset_from_hours(0)), "2026-03-01 22:30");
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("2026-12-31").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
        assert!(parse_date("31.12.2026").is_err());
        assert!(parse_date("2026-02-30").is_err());
    }

    #[test]
    fn test_local_midnight_round_trips_as_date() {
        let offset = offset_from_hours(3);
        let date = NaiveDate::from_ymd_opt(2026, 5, 9).unwrap();
        let ts = local_midnight(date, offset);
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 5, 8, 21, 0, 0).unwrap());
        assert_eq!(format_date(ts, offset), "2026-05-09");
    }

    #[test]
    fn test_offset_out_of_range_falls_back_to_utc() {
        assert_eq!(offset_from_hours(99).local_minus_utc(), 0);
    }
}
