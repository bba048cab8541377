//! Timestamp rendering for the `{time}` placeholder

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pattern used when no other format is configured
pub const DEFAULT_TIME_PATTERN: &str = "%Y-%m-%d %H:%M:%S";

/// How the `{time}` placeholder is rendered
///
/// # Examples
///
/// ```
/// use sinklog::TimestampFormat;
/// use chrono::{Local, TimeZone};
///
/// let at = Local.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
/// assert_eq!(TimestampFormat::default().format(&at), "2025-01-08 10:30:45");
/// assert_eq!(TimestampFormat::pattern("%H:%M").format(&at), "10:30");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// strftime-compatible pattern, e.g. `%Y-%m-%d %H:%M:%S`
    Pattern(String),

    /// ISO 8601 with milliseconds and offset: `2025-01-08T10:30:45.123+00:00`
    Iso8601,

    /// RFC 3339: `2025-01-08T10:30:45+00:00`
    Rfc3339,

    /// Unix timestamp in milliseconds
    UnixMillis,
}

impl Default for TimestampFormat {
    fn default() -> Self {
        TimestampFormat::Pattern(DEFAULT_TIME_PATTERN.to_string())
    }
}

impl TimestampFormat {
    pub fn pattern(pattern: impl Into<String>) -> Self {
        TimestampFormat::Pattern(pattern.into())
    }

    #[must_use]
    pub fn format<Tz>(&self, datetime: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        match self {
            TimestampFormat::Pattern(pattern) => datetime.format(pattern).to_string(),
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
        }
    }
}
