use crate::error::CoreError;
use crate::models::Millis;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Parse an IANA timezone name
pub fn parse_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone).map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// Validate IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<(), CoreError> {
    parse_timezone(timezone).map(|_| ())
}

/// Calendar day of `at` as seen in `tz`.
pub fn day_in(tz: Tz, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// Today's calendar day in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    day_in(tz, Utc::now())
}

/// Render an epoch-millisecond timestamp in `tz`, or `None` if it is out of range.
pub fn format_millis(millis: Millis, tz: Tz, format: &str) -> Option<String> {
    let utc = Utc.timestamp_millis_opt(millis).single()?;
    Some(utc.with_timezone(&tz).format(format).to_string())
}

/// Get timezone abbreviation (e.g., "EST", "EDT")
pub fn get_timezone_abbreviation(tz: Tz, at_time: DateTime<Utc>) -> String {
    at_time.with_timezone(&tz).format("%Z").to_string()
}
