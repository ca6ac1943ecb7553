use std::time::Duration;

/// The `for` text of a rule could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid duration '{input}': {source}")]
pub struct ParseDurationError {
    pub input: String,
    #[source]
    pub source: humantime::DurationError,
}

/// Parses the `for` field of an alert command (`"5m"`, `"1h 30m"`, `"90s"`).
///
/// A bare `"0"` is accepted as zero, matching what dashboards send for
/// "alert immediately".
///
/// # Examples
///
/// ```
/// use alertstore_common::duration::parse_for_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_for_duration("5m").unwrap(), Duration::from_secs(300));
/// assert_eq!(parse_for_duration("0").unwrap(), Duration::ZERO);
/// assert!(parse_for_duration("soon").is_err());
/// ```
pub fn parse_for_duration(text: &str) -> Result<Duration, ParseDurationError> {
    let trimmed = text.trim();
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(trimmed).map_err(|source| ParseDurationError {
        input: text.to_string(),
        source,
    })
}

/// Converts a stored millisecond count back into a [`Duration`]. Negative
/// values (never written by the store) clamp to zero.
pub fn duration_from_millis(ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

/// Millisecond count used for the `for_duration_ms` column.
pub fn duration_to_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
