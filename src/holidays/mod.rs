//! Public holiday calendars
//!
//! Supplies the business-day oracle used by the scheduler. A business day
//! is a weekday that is neither a regional public holiday nor one of the
//! configured extra dates.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::scheduler::workday::{is_weekend, HolidayOracle};

// ============================================================================
// Region
// ============================================================================

/// Holiday region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidayRegion {
    /// Weekends only
    None,
    /// Austrian public holidays
    #[default]
    At,
}

impl HolidayRegion {
    /// Region identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::At => "at",
        }
    }

    /// Public holidays of a year, sorted
    pub fn holidays(&self, year: i32) -> Vec<NaiveDate> {
        match self {
            Self::None => Vec::new(),
            Self::At => austrian_holidays(year),
        }
    }
}

impl fmt::Display for HolidayRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HolidayRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "at" | "austria" => Ok(Self::At),
            other => Err(format!("unknown holiday region '{other}' (expected 'at' or 'none')")),
        }
    }
}

// ============================================================================
// Computus
// ============================================================================

/// Easter Sunday of a year (Gregorian calendar)
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
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

fn austrian_holidays(year: i32) -> Vec<NaiveDate> {
    const FIXED: [(u32, u32); 9] = [
        (1, 1),   // New Year
        (1, 6),   // Epiphany
        (5, 1),   // Labour Day
        (8, 15),  // Assumption
        (10, 26), // National Day
        (11, 1),  // All Saints
        (12, 8),  // Immaculate Conception
        (12, 25), // Christmas
        (12, 26), // St. Stephen
    ];
    // Easter Monday, Ascension, Whit Monday, Corpus Christi
    const EASTER_OFFSETS: [u64; 4] = [1, 39, 50, 60];

    let mut days: Vec<NaiveDate> = FIXED
        .iter()
        .filter_map(|(m, d)| NaiveDate::from_ymd_opt(year, *m, *d))
        .collect();

    if let Some(easter) = easter_sunday(year) {
        days.extend(
            EASTER_OFFSETS
                .iter()
                .filter_map(|offset| easter.checked_add_days(Days::new(*offset))),
        );
    }

    days.sort();
    days
}

// ============================================================================
// Calendar
// ============================================================================

/// Business-day oracle for a region plus extra closing days
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    region: HolidayRegion,
    extra: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    /// Create a calendar for a region
    pub fn new(region: HolidayRegion) -> Self {
        Self {
            region,
            extra: BTreeSet::new(),
        }
    }

    /// Add extra non-business dates
    pub fn with_extra(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.extra.extend(dates);
        self
    }

    /// The region
    pub fn region(&self) -> HolidayRegion {
        self.region
    }

    /// Check if a date is a public holiday or an extra date
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.extra.contains(&date) || self.region.holidays(date.year()).contains(&date)
    }
}

impl HolidayOracle for HolidayCalendar {
    fn is_business_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.is_holiday(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::workday::is_workday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_easter_sunday() {
        assert_eq!(easter_sunday(2023), Some(date(2023, 4, 9)));
        assert_eq!(easter_sunday(2024), Some(date(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(date(2025, 4, 20)));
        assert_eq!(easter_sunday(2026), Some(date(2026, 4, 5)));
    }

    #[test]
    fn test_austrian_holidays_2024() {
        let days = HolidayRegion::At.holidays(2024);
        assert_eq!(days.len(), 13);
        assert!(days.contains(&date(2024, 4, 1))); // Easter Monday
        assert!(days.contains(&date(2024, 5, 9))); // Ascension
        assert!(days.contains(&date(2024, 5, 20))); // Whit Monday
        assert!(days.contains(&date(2024, 5, 30))); // Corpus Christi
        assert!(days.contains(&date(2024, 10, 26)));
    }

    #[test]
    fn test_business_days() {
        let calendar = HolidayCalendar::new(HolidayRegion::At);

        assert!(calendar.is_business_day(date(2024, 1, 2)));
        assert!(!calendar.is_business_day(date(2024, 1, 1)));
        assert!(!calendar.is_business_day(date(2024, 1, 6))); // Saturday and Epiphany
        assert!(!calendar.is_business_day(date(2024, 1, 7)));
    }

    #[test]
    fn test_christmas_freezes_rotation() {
        let calendar = HolidayCalendar::new(HolidayRegion::At);

        // Tue 24 Dec 2024 is a business day, 25 and 26 are holidays
        assert!(is_workday(date(2024, 12, 25), &calendar));
        assert!(!is_workday(date(2024, 12, 26), &calendar));
        assert!(is_workday(date(2024, 12, 27), &calendar));
    }

    #[test]
    fn test_extra_dates() {
        let calendar =
            HolidayCalendar::new(HolidayRegion::None).with_extra([date(2024, 1, 15)]);

        assert!(!calendar.is_business_day(date(2024, 1, 15)));
        assert!(calendar.is_business_day(date(2024, 1, 1)));
        assert!(HolidayRegion::None.holidays(2024).is_empty());
    }

    #[test]
    fn test_region_parse() {
        assert_eq!("AT".parse::<HolidayRegion>(), Ok(HolidayRegion::At));
        assert_eq!("none".parse::<HolidayRegion>(), Ok(HolidayRegion::None));
        assert!("de".parse::<HolidayRegion>().is_err());
    }
}
