// Validation of user-supplied input
//
// Everything here runs before the store is touched; failures are reported
// back to the user and never persisted.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use thiserror::Error;

static CTFTIME_EVENT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://ctftime\.org/event/(\d+)").expect("static regex is valid")
});

/// Accepted naive formats, interpreted as UTC
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Malformed user input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("event name must not be empty")]
    EmptyName,

    #[error("start time {start} must be before end time {end}")]
    StartNotBeforeEnd {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("invalid date '{0}', expected YYYY-MM-DD HH:MM (UTC)")]
    InvalidDate(String),

    #[error("invalid CTFtime event URL '{0}', expected https://ctftime.org/event/<id>")]
    InvalidEventUrl(String),
}

/// Extract the numeric event id from a CTFtime event URL
pub fn parse_ctftime_event_url(url: &str) -> Result<u64, ValidationError> {
    CTFTIME_EVENT_URL
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|id| id.as_str().parse().ok())
        .ok_or_else(|| ValidationError::InvalidEventUrl(url.to_string()))
}

/// Parse a UTC date/time as typed by a user
///
/// Accepts `YYYY-MM-DD HH:MM`, optional seconds, `T` or space separator, or a
/// full RFC 3339 timestamp with offset.
pub fn parse_utc_datetime(input: &str) -> Result<DateTime<Utc>, ValidationError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::InvalidDate(input.to_string()))
}
