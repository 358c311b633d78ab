//! Local time conversion for calendar timestamps.
//!
//! Microsoft Graph reports event times as naive UTC strings with a seven
//! digit fraction (`2025-09-11T11:00:00.0000000`). The display wants them in
//! one fixed local zone, formatted with a numeric offset
//! (`2025-09-11T13:00:00+0200`). [`LocalZone`] does that conversion and
//! [`TimeWindow`] computes the query range for the calendar view.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Output format for converted timestamps, e.g. `2025-09-11T13:00:00+0200`.
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Format of the service timestamp once the fraction has been stripped.
const SOURCE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format of the `startDateTime`/`endDateTime` query parameters.
const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Errors raised while converting timestamps.
#[derive(Debug, Error)]
pub enum TimeError {
    /// The source timestamp did not match `YYYY-MM-DDTHH:MM:SS[.fraction]`.
    #[error("malformed timestamp `{value}`: {source}")]
    MalformedTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The configured timezone is not a known IANA identifier.
    #[error("unknown timezone `{0}`")]
    UnknownTimezone(String),
}

/// The fixed local timezone all condensed times are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalZone(Tz);

impl Default for LocalZone {
    fn default() -> Self {
        Self(chrono_tz::Europe::Berlin)
    }
}

impl LocalZone {
    /// Wraps an already-resolved timezone.
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Resolves an IANA identifier such as `Europe/Berlin`.
    pub fn parse(name: &str) -> Result<Self, TimeError> {
        name.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|_| TimeError::UnknownTimezone(name.to_string()))
    }

    /// Returns the underlying timezone.
    pub fn tz(&self) -> Tz {
        self.0
    }

    /// Returns the IANA name of the zone.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Parses a service timestamp as UTC and converts it into this zone.
    ///
    /// Anything after the first `.` is discarded before parsing.
    pub fn to_local(&self, raw: &str) -> Result<DateTime<Tz>, TimeError> {
        let utc = parse_service_timestamp(raw)?;
        Ok(utc.with_timezone(&self.0))
    }

    /// Converts an optional service timestamp into the display string.
    ///
    /// `None` and the empty string both yield `Ok(None)`.
    pub fn format_local(&self, raw: Option<&str>) -> Result<Option<String>, TimeError> {
        match raw.filter(|s| !s.is_empty()) {
            Some(raw) => Ok(Some(self.to_local(raw)?.format(LOCAL_TIME_FORMAT).to_string())),
            None => Ok(None),
        }
    }

    /// Returns local midnight of the day `now` falls on, as UTC.
    ///
    /// When midnight does not exist locally (a DST gap), the earliest valid
    /// instant of that day is used instead.
    pub fn start_of_day(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.0).date_naive();
        let mut time = NaiveTime::MIN;
        loop {
            if let Some(start) = self.0.from_local_datetime(&today.and_time(time)).earliest() {
                return start.with_timezone(&Utc);
            }
            match time.overflowing_add_signed(Duration::minutes(15)) {
                (next, 0) => time = next,
                _ => return now,
            }
        }
    }
}

impl FromStr for LocalZone {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LocalZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses `YYYY-MM-DDTHH:MM:SS[.fraction]` as a UTC instant.
pub fn parse_service_timestamp(raw: &str) -> Result<DateTime<Utc>, TimeError> {
    let without_fraction = raw.split('.').next().unwrap_or(raw);
    NaiveDateTime::parse_from_str(without_fraction, SOURCE_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| TimeError::MalformedTimestamp {
            value: raw.to_string(),
            source,
        })
}

/// A query range for the calendar view.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window, swapping the bounds if given out of order.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// The window the display is fed with: starting at local midnight
    /// `lookback_days` before today and spanning `days` days.
    pub fn calendar_view(now: DateTime<Utc>, zone: &LocalZone, lookback_days: u32, days: u32) -> Self {
        let start = zone.start_of_day(now) - Duration::days(i64::from(lookback_days));
        Self::new(start, start + Duration::days(i64::from(days)))
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// `startDateTime` query value.
    pub fn start_param(&self) -> String {
        self.start.format(QUERY_TIME_FORMAT).to_string()
    }

    /// `endDateTime` query value.
    pub fn end_param(&self) -> String {
        self.end.format(QUERY_TIME_FORMAT).to_string()
    }
}
