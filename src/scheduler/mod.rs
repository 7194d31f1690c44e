//! On-call rotation scheduling
//!
//! This module computes a fair on-call rotation over a date range and
//! tracks what is already recorded for each day.
//!
//! # Overview
//!
//! Every day of a generation window gets exactly one assignee. The next
//! assignee is the next roster member in `order` sequence who is not
//! unavailable. People are unavailable when they are marked absent or when
//! they already hold too many days (or weekend days) in the current month.
//! If nobody is left, the shadow code is recorded instead.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    RotationEngine                       │
//! │  ┌──────────┐  ┌───────────────┐  ┌─────────────────┐   │
//! │  │  Roster  │  │ FairnessLedger│  │ DayAssignmentSet│   │
//! │  └────┬─────┘  └───────┬───────┘  └────────┬────────┘   │
//! │       │                │                   │            │
//! │       │        ┌───────▼───────┐           │            │
//! │       │        │ UnavailableSet│◀──────────┘            │
//! │       │        └───────┬───────┘                        │
//! │       │                │                                │
//! │       └───────▶┌───────▼─────────┐                      │
//! │                │RotationSelector │                      │
//! │                └─────────────────┘                      │
//! └────────────────────────┬────────────────────────────────┘
//!                          │ fetch_day / fetch_month_counts
//!                          │ absence_codes_for / commit_day
//!                          ▼
//!                 ScheduleStore, AbsenceSource
//! ```
//!
//! # Modules
//!
//! - [`roster`] - People, the shadow, code and order lookup
//! - [`workday`] - Weekend and workday classification
//! - [`ledger`] - Monthly day and weekend counters
//! - [`availability`] - Per-day unavailable set
//! - [`rotation`] - Greedy round-robin selector
//! - [`assignment`] - Per-date records and the fixed flag
//! - [`engine`] - Day-by-day generation driver
//!
//! # Quick Start
//!
//! ```ignore
//! use onduty::calendar::LocalCalendar;
//! use onduty::scheduler::{
//!     Collaborators, GenerationWindow, Person, RestrictionLimits, Roster, RotationEngine,
//!     WeekendsOnly,
//! };
//!
//! let roster = Roster::new(vec![Person::new(0, "ab"), Person::new(1, "cd")], "xx")?;
//! let mut engine = RotationEngine::new(roster, RestrictionLimits::new(10, 2)).with_seed(7);
//!
//! let calendar = LocalCalendar::new();
//! let collaborators = Collaborators::new(&calendar, &calendar, &WeekendsOnly);
//! let report = engine
//!     .generate(&collaborators, &GenerationWindow::new(start, 30))
//!     .await?;
//!
//! for day in &report.days {
//!     println!("{day}");
//! }
//! ```
//!
//! # Fairness Accounting
//!
//! | Event | Ledger change |
//! |-------|---------------|
//! | Unset day assigned | increment new assignee |
//! | Day rewritten to someone else | decrement previous, increment new |
//! | Day re-selected unchanged | none (increment when unrestricted) |
//! | Fixed day | none (increment when unrestricted) |

pub mod assignment;
pub mod availability;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod roster;
pub mod rotation;
pub mod workday;

// Re-export main types
pub use assignment::{AssignmentState, DayAssignment, DayAssignmentSet};
pub use availability::{unavailable_for, UnavailableSet};
pub use engine::{
    Collaborators, DayOutcome, GenerationReport, GenerationWindow, RotationEngine,
};
pub use error::{SchedulerError, SchedulerResult};
pub use ledger::{
    FairnessLedger, MonthKey, RestrictionCounter, RestrictionLimits, RestrictionSet,
};
pub use roster::{Assignee, Person, Roster, DEFAULT_SHADOW_CODE};
pub use rotation::RotationSelector;
pub use workday::{is_weekend, is_workday, EveryDay, HolidayOracle, WeekendsOnly};
