//! Rotation engine
//!
//! Owns the roster, the fairness ledger, the day assignment state and the
//! selector for one run, and drives generation day by day:
//!
//! 1. classify the day (workday, weekend)
//! 2. make sure the ledger covers the day's month
//! 3. build the unavailable set from overload and absences
//! 4. keep a fixed entry, or select the next person
//! 5. update the ledger and the assignment state
//! 6. commit the decision to the schedule store
//!
//! Days are processed strictly in ascending order and every collaborator
//! call is awaited before the next one starts. Any transport failure aborts
//! the run.

use chrono::NaiveDate;
use std::fmt;

use super::assignment::{DayAssignment, DayAssignmentSet};
use super::availability::{unavailable_for, UnavailableSet};
use super::error::{SchedulerError, SchedulerResult};
use super::ledger::{FairnessLedger, RestrictionLimits};
use super::roster::{Assignee, Roster};
use super::rotation::RotationSelector;
use super::workday::{is_weekend, is_workday, HolidayOracle};
use crate::calendar::{AbsenceSource, CommitStatus, ScheduleStore};

// ============================================================================
// Inputs
// ============================================================================

/// External collaborators consulted during generation
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub store: &'a dyn ScheduleStore,
    pub absences: &'a dyn AbsenceSource,
    pub holidays: &'a dyn HolidayOracle,
}

impl<'a> Collaborators<'a> {
    /// Bundle collaborators
    pub fn new(
        store: &'a dyn ScheduleStore,
        absences: &'a dyn AbsenceSource,
        holidays: &'a dyn HolidayOracle,
    ) -> Self {
        Self {
            store,
            absences,
            holidays,
        }
    }
}

impl fmt::Debug for Collaborators<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("store", &self.store.name())
            .finish_non_exhaustive()
    }
}

/// Date range to generate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationWindow {
    pub start: NaiveDate,
    pub days: u32,
    /// Code to treat as the assignee of the day before `start`
    pub last_on: Option<String>,
}

impl GenerationWindow {
    /// Create a window of `days` days starting at `start`
    pub fn new(start: NaiveDate, days: u32) -> Self {
        Self {
            start,
            days,
            last_on: None,
        }
    }

    /// Seed the rotation with a code
    pub fn with_last_on(mut self, code: impl Into<String>) -> Self {
        self.last_on = Some(code.into());
        self
    }

    /// Last generated date
    pub fn end(&self) -> Option<NaiveDate> {
        let span = self.days.checked_sub(1)?;
        self.start
            .checked_add_days(chrono::Days::new(u64::from(span)))
    }

    /// Dates of the window in ascending order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.days as usize)
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// Decision taken for one day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOutcome {
    pub date: NaiveDate,
    pub assignee: Assignee,
    /// Assignee recorded before this run touched the day
    pub previous: Option<Assignee>,
    pub fixed: bool,
    pub workday: bool,
    pub weekend: bool,
    pub unavailable: UnavailableSet,
    /// Store response; `None` for fixed days or when not committed
    pub commit: Option<CommitStatus>,
}

impl DayOutcome {
    /// Whether the assignee differs from what was recorded
    pub fn changed(&self) -> bool {
        !self.fixed && self.previous.as_ref() != Some(&self.assignee)
    }

    /// Nobody was available
    pub fn is_shadow(&self) -> bool {
        self.assignee.is_shadow()
    }
}

impl fmt::Display for DayOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} # {}Out: {}",
            self.date.format("%a %Y-%m-%d"),
            self.assignee,
            if self.fixed { "Fixed," } else { "" },
            self.unavailable
        )
    }
}

/// Result of a generation run
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub days: Vec<DayOutcome>,
}

impl GenerationReport {
    /// Days that fell back to the shadow
    pub fn shadow_days(&self) -> Vec<NaiveDate> {
        self.days
            .iter()
            .filter(|d| d.is_shadow())
            .map(|d| d.date)
            .collect()
    }

    /// Days whose assignee changed
    pub fn changed_days(&self) -> Vec<NaiveDate> {
        self.days
            .iter()
            .filter(|d| d.changed())
            .map(|d| d.date)
            .collect()
    }

    /// Days kept because they were pinned
    pub fn fixed_days(&self) -> Vec<NaiveDate> {
        self.days
            .iter()
            .filter(|d| d.fixed)
            .map(|d| d.date)
            .collect()
    }

    /// Outcome for a date
    pub fn day(&self, date: NaiveDate) -> Option<&DayOutcome> {
        self.days.iter().find(|d| d.date == date)
    }

    /// Assignee of a date
    pub fn assignee_on(&self, date: NaiveDate) -> Option<&Assignee> {
        self.day(date).map(|d| &d.assignee)
    }

    /// Codes in date order
    pub fn codes(&self) -> Vec<&str> {
        self.days.iter().map(|d| d.assignee.code()).collect()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Rotation state for one run
#[derive(Debug)]
pub struct RotationEngine {
    roster: Roster,
    ledger: FairnessLedger,
    days: DayAssignmentSet,
    selector: RotationSelector,
}

impl RotationEngine {
    /// Create an engine for a roster and monthly limits
    pub fn new(roster: Roster, limits: RestrictionLimits) -> Self {
        let ledger = FairnessLedger::new(limits, roster.shadow_code());
        Self {
            roster,
            ledger,
            days: DayAssignmentSet::new(),
            selector: RotationSelector::new(),
        }
    }

    /// Recast from zero counters, ignoring limits
    pub fn with_unrestrict(mut self, unrestrict: bool) -> Self {
        self.ledger = self.ledger.with_unrestrict(unrestrict);
        self
    }

    /// Seed the random anchor
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.selector = RotationSelector::with_seed(seed);
        self
    }

    /// The roster
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The fairness ledger
    pub fn ledger(&self) -> &FairnessLedger {
        &self.ledger
    }

    /// Mutable fairness ledger
    pub fn ledger_mut(&mut self) -> &mut FairnessLedger {
        &mut self.ledger
    }

    /// The day assignment state
    pub fn days(&self) -> &DayAssignmentSet {
        &self.days
    }

    /// Load recorded assignments for `first..=last`
    pub async fn prefetch(
        &mut self,
        store: &dyn ScheduleStore,
        first: NaiveDate,
        last: NaiveDate,
    ) -> SchedulerResult<()> {
        tracing::debug!(from = %first, to = %last, store = store.name(), "Prefetching days");

        for date in first.iter_days().take_while(|d| *d <= last) {
            let entry = store
                .fetch_day(date)
                .await
                .map_err(|e| SchedulerError::transport(date, "fetch_day", e))?;

            match entry {
                Some(entry) => self.days.insert_fetched(DayAssignment {
                    date,
                    assignee: self.roster.resolve(&entry.code),
                    fixed: entry.fixed,
                }),
                None => self.days.clear(date),
            }
        }
        Ok(())
    }

    /// Assignee the rotation continues from
    ///
    /// An explicit code wins, then the recorded assignee of the day before
    /// `start`, then the first roster member.
    pub fn seed_anchor(&self, start: NaiveDate, last_on: Option<&str>) -> SchedulerResult<Assignee> {
        if let Some(code) = last_on {
            return self.roster.lookup(code);
        }
        let recorded = start.pred_opt().and_then(|d| self.days.assignee(d));
        Ok(match recorded {
            Some(assignee) => assignee.clone(),
            None => Assignee::Oncaller(self.roster.first().clone()),
        })
    }

    /// Decide one day
    ///
    /// The ledger must already cover the month of `date`. Updates the
    /// ledger and the assignment state but does not talk to the store.
    pub fn plan_day<S: AsRef<str>>(
        &mut self,
        date: NaiveDate,
        workday: bool,
        absences: &[S],
        last: &Assignee,
    ) -> SchedulerResult<DayOutcome> {
        let weekend = is_weekend(date);
        let existing = self.days.get(date).cloned();
        let unavailable = unavailable_for(
            &self.ledger,
            weekend,
            existing.as_ref().map(|d| d.assignee.code()),
            absences.iter().map(AsRef::<str>::as_ref),
        );

        if let Some(pinned) = existing.as_ref().filter(|d| d.fixed) {
            if self.ledger.is_unrestricted() {
                self.ledger.increment(pinned.assignee.code(), weekend);
            }
            return Ok(DayOutcome {
                date,
                assignee: pinned.assignee.clone(),
                previous: Some(pinned.assignee.clone()),
                fixed: true,
                workday,
                weekend,
                unavailable,
                commit: None,
            });
        }

        let assignee = self
            .selector
            .select_next(&self.roster, &unavailable, last, workday);
        let previous = self.days.assign(date, assignee.clone())?;

        match &previous {
            Some(prev) if *prev == assignee => {
                // Already counted in the fetched month, unless recasting.
                if self.ledger.is_unrestricted() {
                    self.ledger.increment(assignee.code(), weekend);
                }
            }
            Some(prev) => {
                if !self.ledger.is_unrestricted() {
                    self.ledger.decrement(prev.code(), weekend);
                }
                self.ledger.increment(assignee.code(), weekend);
            }
            None => self.ledger.increment(assignee.code(), weekend),
        }

        Ok(DayOutcome {
            date,
            assignee,
            previous,
            fixed: false,
            workday,
            weekend,
            unavailable,
            commit: None,
        })
    }

    /// Generate and commit a window
    pub async fn generate(
        &mut self,
        collaborators: &Collaborators<'_>,
        window: &GenerationWindow,
    ) -> SchedulerResult<GenerationReport> {
        if window.days == 0 {
            return Err(SchedulerError::invalid_window("day count must be at least 1"));
        }
        let end = window
            .end()
            .ok_or_else(|| SchedulerError::invalid_window("window ends past the last date"))?;
        let first = window.start.pred_opt().unwrap_or(window.start);

        self.prefetch(collaborators.store, first, end).await?;
        let mut last = self.seed_anchor(window.start, window.last_on.as_deref())?;

        tracing::info!(
            start = %window.start,
            end = %end,
            days = window.days,
            anchor = %last,
            unrestrict = self.ledger.is_unrestricted(),
            "Generating rotation"
        );

        let mut report = GenerationReport::default();
        for date in window.dates() {
            self.ledger
                .ensure_month(collaborators.store, date)
                .await
                .map_err(|e| SchedulerError::transport(date, "fetch_month_counts", e))?;

            let absences = collaborators
                .absences
                .absence_codes_for(date)
                .await
                .map_err(|e| SchedulerError::transport(date, "absence_codes_for", e))?;

            let workday = is_workday(date, collaborators.holidays);
            let mut outcome = self.plan_day(date, workday, &absences, &last)?;

            if !outcome.fixed {
                let status = collaborators
                    .store
                    .commit_day(date, &outcome.assignee, outcome.previous.as_ref())
                    .await
                    .map_err(|e| SchedulerError::transport(date, "commit_day", e))?;
                outcome.commit = Some(status);
            }

            tracing::info!(
                date = %date.format("%a %Y-%m-%d"),
                code = %outcome.assignee,
                fixed = outcome.fixed,
                workday = outcome.workday,
                out = %outcome.unavailable,
                commit = %outcome.commit.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
                "Day assigned"
            );
            if outcome.is_shadow() {
                tracing::warn!(date = %date, "Nobody available, assigning shadow");
            }

            last = outcome.assignee.clone();
            report.days.push(outcome);
        }

        Ok(report)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::MonthCounts;
    use crate::scheduler::ledger::{MonthKey, RestrictionCounter};
    use crate::scheduler::roster::Person;

    fn roster(codes: &[&str]) -> Roster {
        let people = codes
            .iter()
            .enumerate()
            .map(|(i, c)| Person::new(i, *c))
            .collect();
        Roster::new(people, "xx").unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    const NONE: &[&str] = &[];

    #[test]
    fn test_window_bounds() {
        let window = GenerationWindow::new(date(30), 3);
        assert_eq!(window.end(), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(window.dates().count(), 3);
        assert_eq!(GenerationWindow::new(date(1), 0).end(), None);
    }

    #[test]
    fn test_plan_days_in_order() {
        let mut engine = RotationEngine::new(roster(&["aa", "bb", "cc"]), RestrictionLimits::default());
        let mut last = engine.roster().resolve("aa");
        let mut codes = Vec::new();

        for d in 15..18 {
            let outcome = engine.plan_day(date(d), true, NONE, &last).unwrap();
            last = outcome.assignee.clone();
            codes.push(last.code().to_string());
        }
        assert_eq!(codes, vec!["bb", "cc", "aa"]);
    }

    #[test]
    fn test_fixed_day_kept() {
        let mut engine = RotationEngine::new(roster(&["aa", "bb", "cc"]), RestrictionLimits::new(5, 0));
        engine.ledger_mut().install(MonthKey::new(2024, 1), MonthCounts::new());
        let pinned = engine.roster().resolve("cc");
        engine
            .days
            .insert_fetched(DayAssignment::pinned(date(15), pinned.clone()));

        let last = engine.roster().resolve("aa");
        let outcome = engine.plan_day(date(15), true, &["cc"], &last).unwrap();

        assert!(outcome.fixed);
        assert_eq!(outcome.assignee, pinned);
        assert!(!outcome.changed());
        assert_eq!(engine.ledger().counter("cc"), Some(RestrictionCounter::default()));
    }

    #[test]
    fn test_rewrite_moves_counters() {
        let mut engine = RotationEngine::new(roster(&["aa", "bb", "cc"]), RestrictionLimits::new(10, 0));
        let counts: MonthCounts = [("cc".to_string(), RestrictionCounter::new(3, 0))]
            .into_iter()
            .collect();
        engine.ledger_mut().install(MonthKey::new(2024, 1), counts);
        let cc = engine.roster().resolve("cc");
        engine
            .days
            .insert_fetched(DayAssignment::computed(date(15), cc.clone()));

        let last = engine.roster().resolve("aa");
        let outcome = engine.plan_day(date(15), true, NONE, &last).unwrap();

        assert_eq!(outcome.assignee.code(), "bb");
        assert_eq!(outcome.previous, Some(cc));
        assert!(outcome.changed());
        assert_eq!(engine.ledger().counter("cc").unwrap().days_booked, 2);
        assert_eq!(engine.ledger().counter("bb").unwrap().days_booked, 1);
    }

    #[test]
    fn test_unchanged_day_keeps_counters() {
        let mut engine = RotationEngine::new(roster(&["aa", "bb"]), RestrictionLimits::new(10, 0));
        let counts: MonthCounts = [("bb".to_string(), RestrictionCounter::new(1, 0))]
            .into_iter()
            .collect();
        engine.ledger_mut().install(MonthKey::new(2024, 1), counts);
        let bb = engine.roster().resolve("bb");
        engine.days.insert_fetched(DayAssignment::computed(date(15), bb));

        let last = engine.roster().resolve("aa");
        let outcome = engine.plan_day(date(15), true, NONE, &last).unwrap();

        assert!(!outcome.changed());
        assert_eq!(engine.ledger().counter("bb").unwrap().days_booked, 1);
    }

    #[test]
    fn test_seed_anchor_order() {
        let mut engine = RotationEngine::new(roster(&["aa", "bb", "cc"]), RestrictionLimits::default());

        assert_eq!(engine.seed_anchor(date(15), None).unwrap().code(), "aa");

        let cc = engine.roster().resolve("cc");
        engine.days.insert_fetched(DayAssignment::computed(date(14), cc));
        assert_eq!(engine.seed_anchor(date(15), None).unwrap().code(), "cc");
        assert_eq!(engine.seed_anchor(date(15), Some("BB")).unwrap().code(), "bb");

        let err = engine.seed_anchor(date(15), Some("zz")).unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownOncaller { .. }));
    }

    #[test]
    fn test_outcome_display() {
        let mut engine = RotationEngine::new(roster(&["aa", "bb", "cc"]), RestrictionLimits::default());
        let last = engine.roster().resolve("aa");
        let outcome = engine.plan_day(date(15), true, &["bb"], &last).unwrap();
        assert_eq!(outcome.to_string(), "Mon 2024-01-15: cc # Out: bb");
    }
}
