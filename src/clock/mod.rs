//! Timezone-aware calendar-day resolution. Transactions are stored as UTC
//! instants; budgeting always buckets them by the calendar day they fall on
//! in the user's IANA zone. Feed-reported date-only strings are pinned to
//! UTC noon so that converting back to any real-world offset never shifts
//! the calendar day.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::{CoreError, CoreResult};

/// Zone applied when a user has not set one. USD-only product, US default.
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// The resolved "today" for one user: everything the allocation engine needs
/// to know about the current local calendar position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDay {
    pub date: NaiveDate,
    /// 1-based day of month.
    pub day_index: u32,
    pub days_in_month: u32,
    pub next_month_days: u32,
    pub timezone: Tz,
}

impl LocalDay {
    pub fn iso_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Source of "now". Injected so services stay testable with a fixed instant.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Resolves the current local calendar day in `zone`.
    fn today(&self, zone: Tz) -> LocalDay {
        let local = self.now_utc().with_timezone(&zone);
        let date = local.date_naive();
        LocalDay {
            date,
            day_index: date.day(),
            days_in_month: days_in_month(date.year(), date.month()),
            next_month_days: next_month_days(date.year(), date.month()),
            timezone: zone,
        }
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parses an IANA zone name, falling back to [`DEFAULT_TIMEZONE`] when the
/// name is absent or unrecognized.
pub fn resolve_zone(name: Option<&str>) -> Tz {
    name.filter(|n| !n.is_empty())
        .and_then(|n| n.parse::<Tz>().ok())
        .unwrap_or_else(|| {
            DEFAULT_TIMEZONE
                .parse::<Tz>()
                .unwrap_or(chrono_tz::America::New_York)
        })
}

/// Like [`resolve_zone`], but prefers a configured default over the
/// built-in one.
pub fn resolve_zone_or(name: Option<&str>, default_name: &str) -> Tz {
    name.filter(|n| !n.is_empty())
        .and_then(|n| n.parse::<Tz>().ok())
        .or_else(|| default_name.parse::<Tz>().ok())
        .unwrap_or(chrono_tz::America::New_York)
}

/// Parses a feed-supplied `YYYY-MM-DD` string into a UTC-noon instant.
pub fn date_only_to_utc_noon(date_string: &str) -> CoreResult<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date_string, "%Y-%m-%d")
        .map_err(|_| CoreError::Validation(format!("Invalid date: {date_string}")))?;
    Ok(utc_noon(date))
}

/// Pins a calendar date to 12:00:00 UTC.
pub fn utc_noon(date: NaiveDate) -> DateTime<Utc> {
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
    Utc.from_utc_datetime(&date.and_time(noon))
}

/// Converts a stored UTC instant to the calendar date it falls on in `zone`.
pub fn local_date_of(instant: DateTime<Utc>, zone: Tz) -> NaiveDate {
    instant.with_timezone(&zone).date_naive()
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1);
    match (first, next_first) {
        (Some(a), Some(b)) => (b - a).num_days() as u32,
        _ => 30,
    }
}

pub fn next_month_days(year: i32, month: u32) -> u32 {
    if month == 12 {
        days_in_month(year + 1, 1)
    } else {
        days_in_month(year, month + 1)
    }
}

/// First and last UTC instants of the month containing `day` in `zone`.
/// Bounds are inclusive; stored effective dates are always UTC-noon instants
/// so the noon-based edges cannot clip a real transaction.
pub fn month_bounds(day: &LocalDay) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = NaiveDate::from_ymd_opt(day.date.year(), day.date.month(), 1)
        .unwrap_or(day.date);
    let end = NaiveDate::from_ymd_opt(day.date.year(), day.date.month(), day.days_in_month)
        .unwrap_or(day.date);
    (utc_noon(start), utc_noon(end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_lengths_handle_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(next_month_days(2024, 12), 31);
        assert_eq!(next_month_days(2024, 1), 29);
    }

    #[test]
    fn utc_noon_round_trips_across_us_zones() {
        let instant = date_only_to_utc_noon("2025-03-09").unwrap();
        let la: Tz = "America/Los_Angeles".parse().unwrap();
        let ny: Tz = "America/New_York".parse().unwrap();
        // DST transition day in both zones; noon UTC stays on the same date.
        assert_eq!(local_date_of(instant, la), date(2025, 3, 9));
        assert_eq!(local_date_of(instant, ny), date(2025, 3, 9));
    }

    #[test]
    fn invalid_date_strings_are_rejected() {
        assert!(date_only_to_utc_noon("not-a-date").is_err());
        assert!(date_only_to_utc_noon("2025-13-01").is_err());
    }

    #[test]
    fn unknown_zone_falls_back_to_default() {
        assert_eq!(resolve_zone(Some("Mars/Olympus")), resolve_zone(None));
        assert_eq!(resolve_zone(None).name(), DEFAULT_TIMEZONE);
    }

    #[test]
    fn fixed_clock_resolves_local_day() {
        let clock = FixedClock(utc_noon(date(2025, 1, 31)));
        let day = clock.today(resolve_zone(Some("America/New_York")));
        assert_eq!(day.day_index, 31);
        assert_eq!(day.days_in_month, 31);
        assert_eq!(day.next_month_days, 28);
        assert_eq!(day.iso_date(), "2025-01-31");
    }
}
