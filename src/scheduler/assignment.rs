//! Day assignment state
//!
//! Per-date record of who is on duty and whether the entry is pinned.
//! Records are populated from the schedule store before generation,
//! overwritten in place as days are computed, and never persisted here.
//!
//! ```text
//! Unset ──assign──▶ Computed ──assign──▶ Computed
//!   │
//!   └──insert_fetched(fixed)──▶ Fixed (terminal)
//! ```

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::error::{SchedulerError, SchedulerResult};
use super::roster::Assignee;

/// Who is on duty for one date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayAssignment {
    pub date: NaiveDate,
    pub assignee: Assignee,
    /// Pinned by an external actor; never recomputed
    pub fixed: bool,
}

impl DayAssignment {
    /// Create a computed assignment
    pub fn computed(date: NaiveDate, assignee: Assignee) -> Self {
        Self {
            date,
            assignee,
            fixed: false,
        }
    }

    /// Create a pinned assignment
    pub fn pinned(date: NaiveDate, assignee: Assignee) -> Self {
        Self {
            date,
            assignee,
            fixed: true,
        }
    }
}

/// Lifecycle state of a date's record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentState {
    Unset,
    Computed,
    Fixed,
}

/// Ordered mapping from date to assignment
#[derive(Debug, Clone, Default)]
pub struct DayAssignmentSet {
    days: BTreeMap<NaiveDate, DayAssignment>,
}

impl DayAssignmentSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for a date
    pub fn get(&self, date: NaiveDate) -> Option<&DayAssignment> {
        self.days.get(&date)
    }

    /// Assignee for a date
    pub fn assignee(&self, date: NaiveDate) -> Option<&Assignee> {
        self.days.get(&date).map(|day| &day.assignee)
    }

    /// Lifecycle state of a date
    pub fn state(&self, date: NaiveDate) -> AssignmentState {
        match self.days.get(&date) {
            None => AssignmentState::Unset,
            Some(day) if day.fixed => AssignmentState::Fixed,
            Some(_) => AssignmentState::Computed,
        }
    }

    /// Store a record read from the schedule store, replacing any cached one
    pub fn insert_fetched(&mut self, assignment: DayAssignment) {
        self.days.insert(assignment.date, assignment);
    }

    /// Forget a date (the store has no entry for it)
    pub fn clear(&mut self, date: NaiveDate) {
        self.days.remove(&date);
    }

    /// Overwrite a non-fixed date with a computed assignee
    ///
    /// Returns the previous assignee, if any. Fixed dates are rejected.
    pub fn assign(
        &mut self,
        date: NaiveDate,
        assignee: Assignee,
    ) -> SchedulerResult<Option<Assignee>> {
        if self.state(date) == AssignmentState::Fixed {
            return Err(SchedulerError::FixedDay { date });
        }
        let previous = self
            .days
            .insert(date, DayAssignment::computed(date, assignee))
            .map(|day| day.assignee);
        Ok(previous)
    }

    /// Records in date order
    pub fn iter(&self) -> impl Iterator<Item = &DayAssignment> {
        self.days.values()
    }

    /// Number of recorded dates
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Check if nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::roster::Person;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn person(order: usize, code: &str) -> Assignee {
        Assignee::Oncaller(Person::new(order, code))
    }

    #[test]
    fn test_state_transitions() {
        let mut set = DayAssignmentSet::new();
        assert_eq!(set.state(date(1)), AssignmentState::Unset);

        assert_eq!(set.assign(date(1), person(0, "ab")).unwrap(), None);
        assert_eq!(set.state(date(1)), AssignmentState::Computed);

        let previous = set.assign(date(1), person(1, "cd")).unwrap();
        assert_eq!(previous, Some(person(0, "ab")));
        assert_eq!(set.assignee(date(1)), Some(&person(1, "cd")));
    }

    #[test]
    fn test_fixed_is_terminal() {
        let mut set = DayAssignmentSet::new();
        set.insert_fetched(DayAssignment::pinned(date(2), person(0, "ab")));

        assert_eq!(set.state(date(2)), AssignmentState::Fixed);
        let err = set.assign(date(2), person(1, "cd")).unwrap_err();
        assert!(matches!(err, SchedulerError::FixedDay { .. }));
        assert_eq!(set.assignee(date(2)), Some(&person(0, "ab")));
    }

    #[test]
    fn test_iteration_is_date_ordered() {
        let mut set = DayAssignmentSet::new();
        set.assign(date(3), person(0, "ab")).unwrap();
        set.assign(date(1), person(1, "cd")).unwrap();
        set.insert_fetched(DayAssignment::computed(date(2), person(0, "ab")));

        let dates: Vec<_> = set.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(1), date(2), date(3)]);
        assert_eq!(set.len(), 3);

        set.clear(date(2));
        assert_eq!(set.state(date(2)), AssignmentState::Unset);
    }
}
