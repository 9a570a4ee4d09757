//! Timestamp formatting for the `%d{...}` layout directive
//!
//! The sub-pattern is either one of the named presets below or a chrono
//! strftime string. Strftime strings are checked when the layout is compiled
//! so that rendering can never fail later.

use super::error::{LoggerError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use std::fmt;

/// Timestamp format selected by a `%d{...}` directive
///
/// # Examples
///
/// ```
/// use hierlog::core::TimestampFormat;
///
/// assert_eq!(TimestampFormat::parse("ISO8601").unwrap(), TimestampFormat::Iso8601);
/// assert!(matches!(
///     TimestampFormat::parse("%H:%M:%S").unwrap(),
///     TimestampFormat::Custom(_)
/// ));
/// assert!(TimestampFormat::parse("%Q").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `ISO8601`: `2025-01-08T10:30:45.123+08:00`
    #[default]
    Iso8601,

    /// `RFC3339`: `2025-01-08T10:30:45.123456789+08:00`
    Rfc3339,

    /// `UNIX`: seconds since the epoch
    Unix,

    /// `UNIX_MILLIS`: milliseconds since the epoch
    UnixMillis,

    /// Any other sub-pattern, interpreted as a strftime string
    Custom(String),
}

impl TimestampFormat {
    /// Resolve a `%d{...}` sub-pattern.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidLayout`] if the sub-pattern is empty or
    /// contains a specifier chrono does not understand.
    pub fn parse(pattern: &str) -> Result<Self> {
        match pattern {
            "ISO8601" => Ok(TimestampFormat::Iso8601),
            "RFC3339" => Ok(TimestampFormat::Rfc3339),
            "UNIX" => Ok(TimestampFormat::Unix),
            "UNIX_MILLIS" => Ok(TimestampFormat::UnixMillis),
            "" => Err(LoggerError::layout(pattern, "empty timestamp format")),
            custom => {
                if StrftimeItems::new(custom).any(|item| matches!(item, Item::Error)) {
                    return Err(LoggerError::layout(
                        custom,
                        "invalid strftime specifier in timestamp format",
                    ));
                }
                Ok(TimestampFormat::Custom(custom.to_string()))
            }
        }
    }

    /// Format a timestamp according to this format
    #[must_use]
    pub fn format<Tz>(&self, datetime: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        match self {
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::Unix => datetime.timestamp().to_string(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::Custom(format_str) => datetime.format(format_str).to_string(),
        }
    }
}
