//! Monthly fairness accounting
//!
//! The ledger tracks, per person and calendar month, how many days and
//! weekend days are booked. People at or above the configured limits are
//! reported as overloaded and excluded from selection.
//!
//! Counters are only valid for the month they were built for. Any access
//! for another month goes through [`FairnessLedger::ensure_month`], which
//! rebuilds the set from the schedule store. Rebuilding is expensive, so
//! it happens at most once per distinct month in a run.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::calendar::{MonthCounts, ScheduleStore, TransportResult};

/// Counter pair carried by the shadow so it is never overloaded
pub const SHADOW_COUNTER: RestrictionCounter = RestrictionCounter {
    days_booked: -31,
    weekends_booked: -31,
};

// ============================================================================
// Month Key
// ============================================================================

/// A (year, month) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// Create a month key
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Month containing a date
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the month
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// First day of the following month
    pub fn next_first_day(&self) -> Option<NaiveDate> {
        if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        }
    }

    /// Check if a date falls in this month
    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ============================================================================
// Counters
// ============================================================================

/// Days and weekend days booked for one person in one month
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionCounter {
    pub days_booked: i32,
    pub weekends_booked: i32,
}

impl RestrictionCounter {
    /// Create a counter pair
    pub fn new(days_booked: i32, weekends_booked: i32) -> Self {
        Self {
            days_booked,
            weekends_booked,
        }
    }

    /// Book one more day
    pub fn increment(&mut self, weekend: bool) {
        self.days_booked += 1;
        if weekend {
            self.weekends_booked += 1;
        }
    }

    /// Release one booked day
    ///
    /// A zero count stays at zero; negative counts (the shadow) keep moving.
    /// Returns `true` when a zero count had to be clamped.
    pub fn decrement(&mut self, weekend: bool) -> bool {
        let mut clamped = false;
        if self.days_booked != 0 {
            self.days_booked -= 1;
        } else {
            clamped = true;
        }
        if weekend {
            if self.weekends_booked != 0 {
                self.weekends_booked -= 1;
            } else {
                clamped = true;
            }
        }
        clamped
    }
}

/// Monthly limits per person; zero means "no limit"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionLimits {
    pub max_days_per_month: u32,
    pub max_weekends_per_month: u32,
}

impl RestrictionLimits {
    /// Create limits
    pub fn new(max_days_per_month: u32, max_weekends_per_month: u32) -> Self {
        Self {
            max_days_per_month,
            max_weekends_per_month,
        }
    }

    /// Restrictions are active when at least one limit is set
    pub fn enabled(&self) -> bool {
        self.max_days_per_month > 0 || self.max_weekends_per_month > 0
    }

    /// Check a counter pair against the limits
    pub fn exceeded_by(&self, counter: &RestrictionCounter, weekend: bool) -> bool {
        let days_full = self.max_days_per_month > 0
            && counter.days_booked >= self.max_days_per_month as i32;
        let weekends_full = weekend
            && self.max_weekends_per_month > 0
            && counter.weekends_booked >= self.max_weekends_per_month as i32;
        days_full || weekends_full
    }
}

/// Counters for every person in one month
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictionSet {
    month: MonthKey,
    counters: HashMap<String, RestrictionCounter>,
}

impl RestrictionSet {
    /// Build a set from fetched counts; the shadow gets [`SHADOW_COUNTER`]
    pub fn new(month: MonthKey, counts: MonthCounts, shadow_code: &str) -> Self {
        let mut counters: HashMap<String, RestrictionCounter> = counts
            .into_iter()
            .map(|(code, counter)| (code.to_lowercase(), counter))
            .collect();
        counters.insert(shadow_code.to_string(), SHADOW_COUNTER);
        Self { month, counters }
    }

    /// Month the counters are valid for
    pub fn month(&self) -> MonthKey {
        self.month
    }

    /// Counter for a code (zero if never booked)
    pub fn counter(&self, code: &str) -> RestrictionCounter {
        self.counters
            .get(&code.to_lowercase())
            .copied()
            .unwrap_or_default()
    }

    fn entry(&mut self, code: &str) -> &mut RestrictionCounter {
        self.counters.entry(code.to_lowercase()).or_default()
    }

    /// All counters, sorted by code
    pub fn sorted(&self) -> Vec<(&str, RestrictionCounter)> {
        let mut all: Vec<_> = self
            .counters
            .iter()
            .map(|(code, counter)| (code.as_str(), *counter))
            .collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }
}

// ============================================================================
// Fairness Ledger
// ============================================================================

/// Cached monthly restriction state for one run
#[derive(Debug, Clone)]
pub struct FairnessLedger {
    limits: RestrictionLimits,
    unrestrict: bool,
    shadow_code: String,
    current: Option<RestrictionSet>,
}

impl FairnessLedger {
    /// Create an empty ledger
    pub fn new(limits: RestrictionLimits, shadow_code: impl Into<String>) -> Self {
        Self {
            limits,
            unrestrict: false,
            shadow_code: shadow_code.into(),
            current: None,
        }
    }

    /// Start every month from zero and never report overload
    pub fn with_unrestrict(mut self, unrestrict: bool) -> Self {
        self.unrestrict = unrestrict;
        self
    }

    /// Configured limits
    pub fn limits(&self) -> RestrictionLimits {
        self.limits
    }

    /// Check if running in unrestrict mode
    pub fn is_unrestricted(&self) -> bool {
        self.unrestrict
    }

    /// Counters are kept when limits are set or when recasting from zero
    pub fn is_tracking(&self) -> bool {
        self.limits.enabled() || self.unrestrict
    }

    /// Month of the cached counters
    pub fn month(&self) -> Option<MonthKey> {
        self.current.as_ref().map(RestrictionSet::month)
    }

    /// Cached restriction set
    pub fn current(&self) -> Option<&RestrictionSet> {
        self.current.as_ref()
    }

    /// Whether the cache must be rebuilt before use for this date
    pub fn needs_refresh(&self, date: NaiveDate) -> bool {
        self.is_tracking() && self.month() != Some(MonthKey::of(date))
    }

    /// Replace the cached counters
    ///
    /// In unrestrict mode the fetched counts are discarded and every
    /// counter starts at zero.
    pub fn install(&mut self, month: MonthKey, counts: MonthCounts) {
        let counts = if self.unrestrict {
            MonthCounts::new()
        } else {
            counts
        };
        self.current = Some(RestrictionSet::new(month, counts, &self.shadow_code));
    }

    /// Rebuild the counters for a month from the schedule store
    pub async fn refresh<S: ScheduleStore + ?Sized>(
        &mut self,
        store: &S,
        month: MonthKey,
    ) -> TransportResult<()> {
        if self.unrestrict {
            tracing::debug!(month = %month, "Resetting restriction counters");
            self.install(month, MonthCounts::new());
            return Ok(());
        }

        tracing::debug!(month = %month, store = store.name(), "Fetching restriction info");
        let counts = store.fetch_month_counts(month).await?;
        self.install(month, counts);
        Ok(())
    }

    /// Make sure the counters are valid for the month of `date`
    pub async fn ensure_month<S: ScheduleStore + ?Sized>(
        &mut self,
        store: &S,
        date: NaiveDate,
    ) -> TransportResult<()> {
        if self.needs_refresh(date) {
            self.refresh(store, MonthKey::of(date)).await?;
        }
        Ok(())
    }

    /// Check if a person has reached a monthly limit
    pub fn is_overloaded(&self, code: &str, weekend: bool) -> bool {
        if self.unrestrict || !self.limits.enabled() {
            return false;
        }
        match &self.current {
            Some(set) => self.limits.exceeded_by(&set.counter(code), weekend),
            None => false,
        }
    }

    /// Every overloaded code, sorted
    pub fn overloaded_codes(&self, weekend: bool) -> Vec<String> {
        let Some(set) = &self.current else {
            return Vec::new();
        };
        set.sorted()
            .into_iter()
            .filter(|(code, _)| self.is_overloaded(code, weekend))
            .map(|(code, counter)| {
                tracing::debug!(
                    code = code,
                    days = counter.days_booked,
                    weekends = counter.weekends_booked,
                    "Oncaller overloaded"
                );
                code.to_string()
            })
            .collect()
    }

    /// Counter for a code in the cached month
    pub fn counter(&self, code: &str) -> Option<RestrictionCounter> {
        self.current.as_ref().map(|set| set.counter(code))
    }

    /// Book a day for a person
    pub fn increment(&mut self, code: &str, weekend: bool) {
        if let Some(set) = self.current.as_mut() {
            set.entry(code).increment(weekend);
        }
    }

    /// Release a day previously booked for a person
    pub fn decrement(&mut self, code: &str, weekend: bool) {
        if let Some(set) = self.current.as_mut() {
            if set.entry(code).decrement(weekend) {
                tracing::warn!(
                    code = %code,
                    month = %set.month,
                    weekend = weekend,
                    "Released a day that was never booked; counter kept at zero"
                );
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
