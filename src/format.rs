//! Display formatting helpers
//!
//! Pure functions shared by the render layer: timestamp formatting, markup
//! escaping, terminal sanitizing, and the tolerant timestamp decoder used by
//! the wire types.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use std::fmt::Display;

/// Short clock time shown under each chat bubble, e.g. `09:41`.
pub fn format_time<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    ts.format("%H:%M").to_string()
}

/// Date + time used in the admin tables, e.g. `05/03/2025, 02:07 pm`.
pub fn format_date<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    ts.format("%d/%m/%Y, %I:%M %P").to_string()
}

/// Like [`format_date`], but `Never` for a missing value (last login).
pub fn format_optional_date<Tz: TimeZone>(ts: Option<&DateTime<Tz>>) -> String
where
    Tz::Offset: Display,
{
    ts.map(format_date).unwrap_or_else(|| "Never".to_string())
}

/// Escape text for insertion into HTML markup (element content or a quoted attribute).
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Strip control characters (ANSI escapes included) before printing server text
/// to a terminal. Newlines and tabs are kept.
pub fn sanitize_terminal(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 (`2025-03-05T14:07:00Z`) and the naive ISO form the backend
/// emits for UTC columns (`2025-03-05T14:07:00.123456`).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// serde helper for required timestamp fields.
pub fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// serde helper for nullable timestamp fields.
pub fn de_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
    }
}
