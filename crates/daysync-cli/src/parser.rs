use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, NaiveDate, Utc};
use chrono_english::{parse_date_string, Dialect};
use chrono_tz::Tz;
use daysync_core::models::Recurrence;

use crate::cli::{Frequency, RecurrenceArgs};

/// Parses a day as ISO `YYYY-MM-DD` or natural language relative to now in `tz`.
pub fn parse_day(input: &str, tz: Tz) -> Result<NaiveDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    let now = Utc::now().with_timezone(&tz);
    parse_date_string(input, now, Dialect::Uk)
        .map(|parsed| parsed.date_naive())
        .map_err(|e| anyhow!("Failed to parse date '{}': {}", input, e))
}

/// Weekday numbers for a comma-separated list such as `mon,thu`, 1 = Sunday.
pub fn parse_weekdays(input: &str) -> Result<Vec<u8>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let number = match part.to_lowercase().as_str() {
                "sun" | "sunday" => 1,
                "mon" | "monday" => 2,
                "tue" | "tues" | "tuesday" => 3,
                "wed" | "wednesday" => 4,
                "thu" | "thur" | "thurs" | "thursday" => 5,
                "fri" | "friday" => 6,
                "sat" | "saturday" => 7,
                other => bail!("Unknown weekday '{}'", other),
            };
            Ok(number)
        })
        .collect()
}

/// Builds the recurrence described by the flags. Weekly without `--on`
/// repeats on the weekday of `anchor`.
pub fn build_recurrence(args: &RecurrenceArgs, anchor: NaiveDate) -> Result<Option<Recurrence>> {
    let Some(every) = args.every else {
        if args.on.is_some() || args.interval.is_some() {
            bail!("--on and --interval need --every");
        }
        return Ok(None);
    };

    let recurrence = match every {
        Frequency::Daily => Recurrence::daily(),
        Frequency::Weekly => match args.on.as_deref() {
            Some(days) => Recurrence::weekly(parse_weekdays(days)?),
            None => Recurrence::weekly([anchor.weekday().number_from_sunday() as u8]),
        },
        Frequency::Custom => Recurrence::every_n_days(args.interval.unwrap_or(1)),
    };
    Ok(Some(recurrence))
}
