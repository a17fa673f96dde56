//! Trading calendar: date range to ordered valid trading days.
//!
//! Excludes weekends and a configurable holiday table. Fixed-date holidays
//! follow the observed-holiday rule (Saturday observed the preceding Friday,
//! Sunday the following Monday); floating holidays already land on weekdays.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;

use super::error::HistsimError;

/// One entry of the holiday table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolidayRule {
    /// Same calendar date every year, observed-shifted around weekends.
    Fixed { month: u32, day: u32 },
    /// The nth given weekday of a month (1-based), e.g. 3rd Monday of January.
    NthWeekday {
        month: u32,
        weekday: Weekday,
        nth: u8,
    },
    /// The last given weekday of a month, e.g. last Monday of May.
    LastWeekday { month: u32, weekday: Weekday },
    /// Friday before Easter Sunday.
    GoodFriday,
}

impl HolidayRule {
    /// Observed holiday date for a given year, if the rule is expressible.
    fn date_in(&self, year: i32) -> Option<NaiveDate> {
        match *self {
            HolidayRule::Fixed { month, day } => {
                NaiveDate::from_ymd_opt(year, month, day).map(observed)
            }
            HolidayRule::NthWeekday {
                month,
                weekday,
                nth,
            } => NaiveDate::from_weekday_of_month_opt(year, month, weekday, nth),
            HolidayRule::LastWeekday { month, weekday } => {
                last_weekday_of_month(year, month, weekday)
            }
            HolidayRule::GoodFriday => easter_sunday(year).map(|e| e - Duration::days(2)),
        }
    }
}

/// Default US equity exchange holiday table.
pub fn us_equity_holidays() -> Vec<HolidayRule> {
    vec![
        // New Year's Day
        HolidayRule::Fixed { month: 1, day: 1 },
        // Martin Luther King Jr. Day
        HolidayRule::NthWeekday {
            month: 1,
            weekday: Weekday::Mon,
            nth: 3,
        },
        // Presidents' Day
        HolidayRule::NthWeekday {
            month: 2,
            weekday: Weekday::Mon,
            nth: 3,
        },
        HolidayRule::GoodFriday,
        // Memorial Day
        HolidayRule::LastWeekday {
            month: 5,
            weekday: Weekday::Mon,
        },
        // Independence Day
        HolidayRule::Fixed { month: 7, day: 4 },
        // Labor Day
        HolidayRule::NthWeekday {
            month: 9,
            weekday: Weekday::Mon,
            nth: 1,
        },
        // Thanksgiving
        HolidayRule::NthWeekday {
            month: 11,
            weekday: Weekday::Thu,
            nth: 4,
        },
        // Christmas Day
        HolidayRule::Fixed { month: 12, day: 25 },
    ]
}

/// Converts a date range into the ordered set of valid trading dates.
///
/// Pure and deterministic: identical inputs always yield an identical
/// sequence, and `trading_days` can be called any number of times.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    start: NaiveDate,
    end: NaiveDate,
    holidays: Vec<HolidayRule>,
}

impl TradingCalendar {
    /// Calendar over `[start, end]` with the default US holiday table.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, HistsimError> {
        Self::with_holidays(start, end, us_equity_holidays())
    }

    pub fn with_holidays(
        start: NaiveDate,
        end: NaiveDate,
        holidays: Vec<HolidayRule>,
    ) -> Result<Self, HistsimError> {
        if end < start {
            return Err(HistsimError::InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end,
            holidays,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Ascending, deduplicated trading dates within the range.
    pub fn trading_days(&self) -> Vec<NaiveDate> {
        let holidays = self.observed_holidays();
        let mut days = Vec::new();
        let mut date = self.start;
        while date <= self.end {
            if !is_weekend(date) && !holidays.contains(&date) {
                days.push(date);
            }
            date += Duration::days(1);
        }
        days
    }

    // Observed dates for all rule years that can land inside the range.
    // New Year's Day of year N+1 can be observed on Dec 31 of year N, so
    // the year after the range end is included.
    fn observed_holidays(&self) -> BTreeSet<NaiveDate> {
        let mut set = BTreeSet::new();
        for year in self.start.year()..=self.end.year() + 1 {
            for rule in &self.holidays {
                if let Some(date) = rule.date_in(year) {
                    set.insert(date);
                }
            }
        }
        set
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Saturday observed the preceding Friday; Sunday the following Monday.
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }?;
    let mut date = first_of_next - Duration::days(1);
    while date.weekday() != weekday {
        date -= Duration::days(1);
    }
    Some(date)
}

/// Anonymous Gregorian computus (Meeus/Jones/Butcher).
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}
