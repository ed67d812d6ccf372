//! Parsing of the coarse age labels shown on feed posts ("3d", "1w", "2mo").
//!
//! Only used to estimate a post's age when its URN is not exposed; comment
//! timestamps always come from identifiers.

use chrono::Duration;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref AGE_LABEL: Regex = Regex::new(
        r"(?i)(\d+)\s*(months?|mos?|minutes?|mins?|m|seconds?|secs?|s|hours?|hrs?|h|days?|d|weeks?|wks?|w|years?|yrs?|y)\b"
    )
    .unwrap();
}

/// Approximate age described by a post label, or `None` if it is not one
pub fn parse_age(label: &str) -> Option<Duration> {
    // "3d • Edited • Visible to anyone" -> "3d"
    let label = label.split('•').next().unwrap_or_default().trim();
    let lower = label.to_lowercase();
    if lower == "now" || lower == "just now" {
        return Some(Duration::zero());
    }

    let caps = AGE_LABEL.captures(label)?;
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_lowercase();

    // Out-of-range amounts are not a label we can trust
    match unit.as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => Duration::try_seconds(amount),
        "m" | "min" | "mins" | "minute" | "minutes" => Duration::try_minutes(amount),
        "h" | "hr" | "hrs" | "hour" | "hours" => Duration::try_hours(amount),
        "d" | "day" | "days" => Duration::try_days(amount),
        "w" | "wk" | "wks" | "week" | "weeks" => Duration::try_weeks(amount),
        "mo" | "mos" | "month" | "months" => Duration::try_days(amount.checked_mul(30)?),
        "y" | "yr" | "yrs" | "year" | "years" => Duration::try_days(amount.checked_mul(365)?),
        _ => None,
    }
}
