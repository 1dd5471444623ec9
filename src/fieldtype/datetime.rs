//! Datetime fieldtype and date normalization
//!
//! Dates are stored as `YYYY-MM-DD HH:MM:SS` text in UTC, which compares
//! correctly as a string.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use super::{unsupported, Fieldtype};
use crate::error::Result;
use crate::query::{escape_string, is_digits, SelectQuery};
use crate::selector::Operator;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y", "%B %d %Y"];

lazy_static::lazy_static! {
    // "3 days ago", "-2 weeks", "+1 month"
    static ref RELATIVE_REGEX: Regex = Regex::new(
        r"(?i)^([+-]?\d+)\s*(sec|second|min|minute|hour|day|week|month|year)s?(\s+ago)?$"
    ).unwrap();
}

/// Normalize a timestamp or free-form date to `YYYY-MM-DD HH:MM:SS`
pub fn normalize_datetime(value: &str) -> Option<String> {
    normalize_datetime_at(value, Utc::now())
}

/// Same as [`normalize_datetime`], relative to a given "now"
pub fn normalize_datetime_at(value: &str, now: DateTime<Utc>) -> Option<String> {
    parse_datetime(value.trim(), now).map(|dt| dt.format(DATETIME_FORMAT).to_string())
}

fn parse_datetime(value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if is_digits(value) {
        return Utc.timestamp_opt(value.parse().ok()?, 0).single();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }

    let midnight = |dt: DateTime<Utc>| dt.date_naive().and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));

    match value.to_lowercase().as_str() {
        "now" => return Some(now),
        "today" => return midnight(now),
        "yesterday" => return midnight(now - Duration::days(1)),
        "tomorrow" => return midnight(now + Duration::days(1)),
        _ => {}
    }

    let caps = RELATIVE_REGEX.captures(value)?;
    let mut amount: i64 = caps.get(1)?.as_str().parse().ok()?;
    if caps.get(3).is_some() {
        amount = -amount;
    }

    let seconds_per = match caps.get(2)?.as_str().to_lowercase().as_str() {
        "sec" | "second" => 1,
        "min" | "minute" => 60,
        "hour" => 3600,
        "day" => 86_400,
        "week" => 604_800,
        "month" => return shift_months(now, amount),
        "year" => return shift_months(now, amount.checked_mul(12)?),
        _ => return None,
    };

    now.checked_add_signed(Duration::try_seconds(amount.checked_mul(seconds_per)?)?)
}

fn shift_months(now: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let count = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months < 0 {
        now.checked_sub_months(count)
    } else {
        now.checked_add_months(count)
    }
}

/// Date and time stored as normalized text
pub struct DatetimeFieldtype;

impl Fieldtype for DatetimeFieldtype {
    fn name(&self) -> &'static str {
        "datetime"
    }

    fn match_query(
        &self,
        query: &mut SelectQuery,
        table_alias: &str,
        column: &str,
        operator: Operator,
        value: &str,
    ) -> Result<()> {
        let op = match operator {
            Operator::BitwiseAnd => None,
            other => other.sql_comparison(),
        }
        .ok_or_else(|| unsupported(operator, table_alias, column))?;

        match normalize_datetime(value) {
            Some(date) => query.where_(format!("{}.{}{}'{}'", table_alias, column, op, escape_string(&date))),
            None => query.where_("1>2"),
        };

        Ok(())
    }
}
