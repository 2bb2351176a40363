//! Reference-time types for guide windows.
//!
//! This module provides [`ReferenceZone`], the single timezone every window
//! boundary and every local-time provider timestamp is anchored to, and
//! [`TimeWindow`], the absolute `[start, end)` range a guide run covers.
//!
//! Windows are computed in local wall-clock time and converted to UTC at the
//! edges, so a week that crosses a daylight-saving change still covers seven
//! local calendar days even though it is not 168 hours of elapsed time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// The timezone all providers and outputs are anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone(Tz);

impl ReferenceZone {
    /// The zone every supported provider publishes local times in.
    pub const DEFAULT_NAME: &'static str = "Asia/Jerusalem";

    /// Wraps a chrono-tz zone.
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Returns the wrapped zone.
    pub fn tz(&self) -> Tz {
        self.0
    }

    /// Returns the IANA name of the zone.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Converts a UTC instant into local wall-clock time.
    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.0)
    }

    /// Returns the local calendar date of a UTC instant.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_local(instant).date_naive()
    }

    /// Resolves a naive local wall-clock time to an absolute instant.
    ///
    /// Ambiguous times (the repeated hour when clocks go back) resolve to the
    /// earlier instant. Times inside a spring-forward gap are pushed forward by
    /// the size of the gap, so `02:30` on a day that skips `02:00-03:00`
    /// becomes `03:30` local. Returns `None` only if no offset can be found.
    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.0.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => {
                // Gaps are at most a couple of hours in the tz database.
                (1..=3).find_map(|hours| {
                    self.0
                        .from_local_datetime(&(naive + Duration::hours(hours)))
                        .earliest()
                        .map(|dt| dt.with_timezone(&Utc))
                })
            }
        }
    }

    /// Returns the absolute instant of local midnight starting `date`.
    pub fn midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(chrono::NaiveTime::MIN);
        self.localize(naive)
            .unwrap_or_else(|| naive.and_utc())
    }
}

impl Default for ReferenceZone {
    fn default() -> Self {
        Self(chrono_tz::Asia::Jerusalem)
    }
}

impl FromStr for ReferenceZone {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|_| TimeError::UnknownZone(s.to_string()))
    }
}

impl fmt::Display for ReferenceZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while interpreting reference-time settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    /// The IANA zone name is not in the bundled tz database.
    #[error("unknown timezone: {0}")]
    UnknownZone(String),
    /// A window policy name could not be parsed.
    #[error("unknown window policy: {0} (expected \"day\" or \"week\")")]
    UnknownPolicy(String),
    /// A week-start name could not be parsed.
    #[error("unknown week start: {0} (expected \"sunday\" or \"monday\")")]
    UnknownWeekStart(String),
}

/// Which period a guide run covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowPolicy {
    /// Local midnight today to local midnight tomorrow.
    Day,
    /// Local midnight of the most recent week start, seven local days long.
    #[default]
    Week,
}

impl FromStr for WindowPolicy {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            other => Err(TimeError::UnknownPolicy(other.to_string())),
        }
    }
}

/// The first day of a guide week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    /// Weeks start on Sunday (the broadcast week in Israel).
    #[default]
    Sunday,
    /// Weeks start on Monday.
    Monday,
}

impl WeekStart {
    /// Days elapsed since the most recent week start, for a given weekday.
    fn days_since_start(&self, weekday: chrono::Weekday) -> i64 {
        match self {
            Self::Sunday => i64::from(weekday.num_days_from_sunday()),
            Self::Monday => i64::from(weekday.num_days_from_monday()),
        }
    }
}

impl FromStr for WeekStart {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(Self::Sunday),
            "monday" | "mon" => Ok(Self::Monday),
            other => Err(TimeError::UnknownWeekStart(other.to_string())),
        }
    }
}

/// A time window for a guide run.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Computes the window for `policy` as seen at `now`.
    ///
    /// Pure: the result depends only on the arguments.
    pub fn for_policy(
        now: DateTime<Utc>,
        policy: WindowPolicy,
        zone: &ReferenceZone,
        week_start: WeekStart,
    ) -> Self {
        let today = zone.local_date(now);
        match policy {
            WindowPolicy::Day => Self::for_days(today, 1, zone),
            WindowPolicy::Week => {
                let back = week_start.days_since_start(today.weekday());
                Self::for_days(today - Duration::days(back), 7, zone)
            }
        }
    }

    /// Creates a window covering `days` local calendar days from `first`.
    pub fn for_days(first: NaiveDate, days: u32, zone: &ReferenceZone) -> Self {
        let last = first + Duration::days(i64::from(days));
        Self::new(zone.midnight(first), zone.midnight(last))
    }

    /// Creates a window for a single local calendar day.
    pub fn for_date(date: NaiveDate, zone: &ReferenceZone) -> Self {
        Self::for_days(date, 1, zone)
    }

    /// Checks if the range `[start, end)` overlaps this window.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }

    /// Returns every local calendar day the window touches, in order.
    ///
    /// An empty window touches no days.
    pub fn local_days(&self, zone: &ReferenceZone) -> Vec<NaiveDate> {
        if self.start >= self.end {
            return Vec::new();
        }
        let first = zone.local_date(self.start);
        // The end is exclusive, so step back one second before taking its date.
        let last = zone.local_date(self.end - Duration::seconds(1));
        first.iter_days().take_while(|d| *d <= last).collect()
    }

    /// Splits the window into one sub-window per local calendar day.
    ///
    /// The first and last slices are clipped to the window edges.
    pub fn split_by_local_day(&self, zone: &ReferenceZone) -> Vec<(NaiveDate, TimeWindow)> {
        self.local_days(zone)
            .into_iter()
            .map(|day| {
                let whole = Self::for_date(day, zone);
                let start = whole.start.max(self.start);
                let end = whole.end.min(self.end);
                (day, Self::new(start, end))
            })
            .collect()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
