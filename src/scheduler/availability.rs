//! Per-day unavailable set
//!
//! Merges fairness overload with absence markers. Codes are lower-cased
//! and deduplicated; the result is the only input the selector needs to
//! decide who may not be on duty.

use std::collections::BTreeSet;
use std::fmt;

use super::ledger::FairnessLedger;
use super::roster::Roster;

/// Codes that must not be selected for one day
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnavailableSet {
    codes: BTreeSet<String>,
}

impl UnavailableSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a code, returning false if it was already present
    pub fn insert(&mut self, code: &str) -> bool {
        self.codes.insert(code.trim().to_lowercase())
    }

    /// Check if a code is unavailable (case-insensitive)
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(&code.to_lowercase())
    }

    /// Number of distinct codes
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Check if nobody is unavailable
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Codes in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    /// Whether every roster member is unavailable
    ///
    /// Only roster codes count; unknown absence codes and the shadow do not
    /// make the set cover the roster.
    pub fn covers(&self, roster: &Roster) -> bool {
        roster.people().iter().all(|p| self.codes.contains(&p.code))
    }
}

impl<S: AsRef<str>> FromIterator<S> for UnavailableSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for code in iter {
            set.insert(code.as_ref());
        }
        set
    }
}

impl fmt::Display for UnavailableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(","))
    }
}

/// Build the unavailable set for a day
///
/// Overloaded people are excluded, except whoever is already assigned to
/// the day: their booking is part of the counters, so excluding them would
/// push them off a day they legitimately hold. Absent codes are always
/// excluded.
pub fn unavailable_for<I, S>(
    ledger: &FairnessLedger,
    weekend: bool,
    assigned_today: Option<&str>,
    absences: I,
) -> UnavailableSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let assigned_today = assigned_today.map(str::to_lowercase);
    let mut set: UnavailableSet = ledger
        .overloaded_codes(weekend)
        .into_iter()
        .filter(|code| assigned_today.as_deref() != Some(code.as_str()))
        .collect();

    for code in absences {
        set.insert(code.as_ref());
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::MonthCounts;
    use crate::scheduler::ledger::{MonthKey, RestrictionCounter, RestrictionLimits};
    use crate::scheduler::roster::Person;

    fn roster() -> Roster {
        let people = ["ab", "cd", "ef"]
            .iter()
            .enumerate()
            .map(|(i, c)| Person::new(i, *c))
            .collect();
        Roster::new(people, "xx").unwrap()
    }

    fn ledger_with(entries: &[(&str, i32, i32)]) -> FairnessLedger {
        let mut ledger = FairnessLedger::new(RestrictionLimits::new(2, 1), "xx");
        let counts: MonthCounts = entries
            .iter()
            .map(|(c, d, w)| (c.to_string(), RestrictionCounter::new(*d, *w)))
            .collect();
        ledger.install(MonthKey::new(2024, 1), counts);
        ledger
    }

    #[test]
    fn test_merge_and_dedup() {
        let ledger = ledger_with(&[("ab", 2, 0)]);
        let set = unavailable_for(&ledger, false, None, ["AB", "cd", "cd"]);

        assert_eq!(set.len(), 2);
        assert!(set.contains("ab"));
        assert!(set.contains("CD"));
        assert_eq!(set.to_string(), "ab,cd");
    }

    #[test]
    fn test_self_reference_guard() {
        let ledger = ledger_with(&[("ab", 2, 0), ("cd", 2, 0)]);
        let set = unavailable_for(&ledger, false, Some("AB"), Vec::<String>::new());

        assert!(!set.contains("ab"));
        assert!(set.contains("cd"));
    }

    #[test]
    fn test_guard_does_not_override_absence() {
        let ledger = ledger_with(&[("ab", 2, 0)]);
        let set = unavailable_for(&ledger, false, Some("ab"), ["ab"]);
        assert!(set.contains("ab"));
    }

    #[test]
    fn test_weekend_overload_only_on_weekends() {
        let ledger = ledger_with(&[("ab", 1, 1)]);

        assert!(unavailable_for(&ledger, false, None, Vec::<&str>::new()).is_empty());
        assert!(unavailable_for(&ledger, true, None, Vec::<&str>::new()).contains("ab"));
    }

    #[test]
    fn test_covers_counts_roster_members_only() {
        let roster = roster();

        let partial: UnavailableSet = ["ab", "cd", "zz"].into_iter().collect();
        assert!(!partial.covers(&roster));

        let full: UnavailableSet = ["ab", "cd", "ef"].into_iter().collect();
        assert!(full.covers(&roster));
    }
}
