//! Parsing of "since" expressions and explicit commit dates
//!
//! Accepted "since" forms:
//! - relative, git style: `2.weeks`, `3 days`, `10.hours.ago`, `1 month ago`
//! - `now`, `today`, `yesterday`
//! - absolute: RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` (local time)
//! - Unix epoch: `@1717400000`
//!
//! Months count as 30 days and years as 365 days.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use regex::Regex;
use std::sync::OnceLock;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn relative_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(\d+)[.\s]+(second|sec|minute|min|hour|day|week|month|year)s?(?:[.\s]+ago)?$",
        )
        .expect("valid regex")
    })
}

/// Resolve a "since" expression against `now`.
pub fn parse_since(expr: &str, now: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>> {
    let expr = expr.trim();
    if expr.is_empty() {
        bail!("Empty since expression");
    }

    match expr.to_lowercase().as_str() {
        "now" => return Ok(now),
        "today" => return start_of_day(now, 0),
        "yesterday" => return start_of_day(now, 1),
        _ => {}
    }

    if let Some(caps) = relative_re().captures(expr) {
        let amount: i64 = caps[1]
            .parse()
            .with_context(|| format!("Amount out of range in '{}'", expr))?;
        let unit = caps[2].to_lowercase();
        let span = match unit.as_str() {
            "second" | "sec" => Duration::try_seconds(amount),
            "minute" | "min" => Duration::try_minutes(amount),
            "hour" => Duration::try_hours(amount),
            "day" => Duration::try_days(amount),
            "week" => Duration::try_weeks(amount),
            "month" => amount.checked_mul(30).and_then(Duration::try_days),
            "year" => amount.checked_mul(365).and_then(Duration::try_days),
            _ => None,
        }
        .ok_or_else(|| anyhow!("Time span out of range in '{}'", expr))?;
        return now
            .checked_sub_signed(span)
            .ok_or_else(|| anyhow!("'{}' reaches before the supported date range", expr));
    }

    parse_absolute(expr).with_context(|| {
        format!(
            "Unrecognized since expression '{}'. Examples: 2.weeks, 3 days ago, 2024-06-01, 2024-06-01 18:00:00",
            expr
        )
    })
}

/// Parse an explicit date for a single-commit override.
///
/// `YYYY-MM-DD HH:MM:SS` is read in the local time zone; RFC 3339 keeps its
/// own offset.
pub fn parse_commit_date(value: &str) -> Result<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date);
    }
    let naive = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).map_err(|_| {
        anyhow!(
            "Commit date format should be YYYY-MM-DD HH:MM:SS or RFC 3339 (got '{}')",
            value
        )
    })?;
    local(naive)
}

fn parse_absolute(expr: &str) -> Result<DateTime<FixedOffset>> {
    if let Some(epoch) = expr.strip_prefix('@') {
        let secs: i64 = epoch.parse().context("Invalid epoch seconds")?;
        let utc = DateTime::from_timestamp(secs, 0).ok_or_else(|| anyhow!("Epoch out of range"))?;
        return Ok(utc.fixed_offset());
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(expr) {
        return Ok(date);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(expr, DATETIME_FORMAT) {
        return local(naive);
    }
    let day = NaiveDate::parse_from_str(expr, "%Y-%m-%d")?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid date"))?;
    local(midnight)
}

fn start_of_day(now: DateTime<FixedOffset>, days_back: i64) -> Result<DateTime<FixedOffset>> {
    let day = now.date_naive() - Duration::days(days_back);
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid date"))?;
    now.offset()
        .from_local_datetime(&midnight)
        .single()
        .ok_or_else(|| anyhow!("Ambiguous local date {}", midnight))
}

fn local(naive: NaiveDateTime) -> Result<DateTime<FixedOffset>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|d| d.fixed_offset())
        .ok_or_else(|| anyhow!("{} does not exist in the local time zone", naive))
}
