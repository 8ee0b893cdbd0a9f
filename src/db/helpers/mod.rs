use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// RFC 3339 in UTC with exactly three fractional digits, so stored strings
/// sort in time order.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}
