//! Business-day classification
//!
//! Rotation only advances on workdays. A holiday sandwiched between two
//! business days still rotates; only a non-business day that follows
//! another non-business day freezes the rotation.

use chrono::{Datelike, NaiveDate, Weekday};

/// Yes/no oracle for business days
pub trait HolidayOracle: Send + Sync {
    /// Check if the date is a business day (not a weekend, not a holiday)
    fn is_business_day(&self, date: NaiveDate) -> bool;
}

/// Saturday or Sunday
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Whether the rotation advances on this date
pub fn is_workday<H: HolidayOracle + ?Sized>(date: NaiveDate, holidays: &H) -> bool {
    if holidays.is_business_day(date) {
        return true;
    }
    match date.pred_opt() {
        Some(previous) => holidays.is_business_day(previous),
        None => true,
    }
}

/// Oracle that only knows about weekends
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekendsOnly;

impl HolidayOracle for WeekendsOnly {
    fn is_business_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date)
    }
}

/// Oracle that treats every day as a business day
#[derive(Debug, Clone, Copy, Default)]
pub struct EveryDay;

impl HolidayOracle for EveryDay {
    fn is_business_day(&self, _date: NaiveDate) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_is_weekend() {
        assert!(!is_weekend(date(2024, 1, 12))); // Fri
        assert!(is_weekend(date(2024, 1, 13))); // Sat
        assert!(is_weekend(date(2024, 1, 14))); // Sun
        assert!(!is_weekend(date(2024, 1, 15))); // Mon
    }

    #[test]
    fn test_weekend_workday_pattern() {
        let oracle = WeekendsOnly;

        // Saturday follows a business day: rotation still advances
        assert!(is_workday(date(2024, 1, 13), &oracle));
        // Sunday follows Saturday: rotation freezes
        assert!(!is_workday(date(2024, 1, 14), &oracle));
        // Monday is a business day
        assert!(is_workday(date(2024, 1, 15), &oracle));
    }

    #[test]
    fn test_every_day_is_workday() {
        for d in 1..=31 {
            assert!(is_workday(date(2024, 1, d), &EveryDay));
        }
    }

    #[test]
    fn test_first_representable_date() {
        assert!(is_workday(NaiveDate::MIN, &WeekendsOnly));
    }
}
