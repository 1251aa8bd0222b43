//! Trading calendar: timezone- and holiday-aware daily reset boundaries.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// Search horizon when scanning for the next trading day.
///
/// A calendar that yields no trading day within two years is malformed
/// configuration; boundary lookups return None past this cap.
const MAX_SCAN_DAYS: i64 = 732;

/// Daily reset boundary: a time-of-day in a fixed timezone, skipping
/// weekends and configured holidays.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    reset_time: NaiveTime,
    tz: Tz,
    holidays: HashSet<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(reset_time: NaiveTime, tz: Tz, holidays: HashSet<NaiveDate>) -> Self {
        Self {
            reset_time,
            tz,
            holidays,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Weekdays that are not configured holidays.
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// The trading day owning the instant `at` (local date in the
    /// calendar timezone).
    pub fn trading_day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.tz).date_naive()
    }

    /// First reset boundary strictly after `after` that falls on a
    /// trading day.
    pub fn next_boundary(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut date = after.with_timezone(&self.tz).date_naive();
        for _ in 0..MAX_SCAN_DAYS {
            if self.is_trading_day(date) {
                if let Some(at) = self.boundary_instant(date) {
                    if at > after {
                        return Some(at);
                    }
                }
            }
            date = date.succ_opt()?;
        }
        None
    }

    /// Most recent reset boundary at or before `before` that falls on a
    /// trading day.
    pub fn last_boundary(&self, before: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut date = before.with_timezone(&self.tz).date_naive();
        for _ in 0..MAX_SCAN_DAYS {
            if self.is_trading_day(date) {
                if let Some(at) = self.boundary_instant(date) {
                    if at <= before {
                        return Some(at);
                    }
                }
            }
            date = date.pred_opt()?;
        }
        None
    }

    /// Resolve the boundary's local wall-clock time to a UTC instant.
    ///
    /// A reset time inside a spring-forward gap is nudged one hour later.
    fn boundary_instant(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let local = date.and_time(self.reset_time);
        self.tz
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(local + Duration::hours(1)))
                    .earliest()
            })
            .map(|at| at.with_timezone(&Utc))
    }
}
