// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time and date placeholder substitution.
//!
//! Placeholders of the form `@NAME@` are replaced against a table derived
//! from the current time before the line is parsed. The env key `now`
//! (RFC 3339, UTC) overrides the clock; unresolved placeholders pass
//! through untouched. Substitution never fails.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc, Weekday};
use serde_json::Value as Json;

use crate::command::Env;

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("MONDAY", Weekday::Mon),
    ("TUESDAY", Weekday::Tue),
    ("WEDNESDAY", Weekday::Wed),
    ("THURSDAY", Weekday::Thu),
    ("FRIDAY", Weekday::Fri),
    ("SATURDAY", Weekday::Sat),
    ("SUNDAY", Weekday::Sun),
];

/// The placeholder table for the resolved current time.
///
/// Local-time forms fall back to UTC when no local zone conversion is
/// available; this is defined behavior, not an error.
pub fn replacements(env: &Env) -> Vec<(&'static str, String)> {
    let utc = resolved_now(env);
    let local = utc.with_timezone(&Local);
    let today = utc.date_naive();

    let mut table = vec![
        ("UTC", utc.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        ("NOW", local.format("%Y-%m-%dT%H:%M:%S%z").to_string()),
        ("TODAY", today.format("%Y-%m-%d").to_string()),
        ("TOMORROW", (today + Duration::days(1)).format("%Y-%m-%d").to_string()),
        ("YESTERDAY", (today - Duration::days(1)).format("%Y-%m-%d").to_string()),
        ("YEAR", today.format("%Y").to_string()),
        ("MONTH", today.format("%m").to_string()),
        ("DAY", today.format("%d").to_string()),
        ("TIME", local.format("%H:%M:%S").to_string()),
        ("HOUR", local.format("%H").to_string()),
        ("MINUTE", local.format("%M").to_string()),
        ("SECOND", local.format("%S").to_string()),
        ("TZ_OFFSET", local.format("%z").to_string()),
        ("TZ", local.format("%Z").to_string()),
    ];
    for (name, weekday) in WEEKDAYS {
        table.push((name, next_weekday(today, weekday).format("%Y-%m-%d").to_string()));
    }
    table
}

/// Replace every known `@NAME@` placeholder in one left-to-right pass.
pub fn substitute(input: &str, env: &Env) -> String {
    replacements(env)
        .into_iter()
        .fold(input.to_string(), |text, (name, value)| text.replace(&format!("@{name}@"), &value))
}

fn resolved_now(env: &Env) -> DateTime<Utc> {
    env.get("now")
        .and_then(Json::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// The next occurrence of `weekday` on or after `date`.
fn next_weekday(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (weekday.num_days_from_monday() + 7 - date.weekday().num_days_from_monday()) % 7;
    date + Duration::days(i64::from(ahead))
}

#[cfg(test)]
#[path = "placeholder_tests.rs"]
mod tests;
