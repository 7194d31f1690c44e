//! onduty - fair on-call rotation generator
//!
//! Builds a day-by-day on-call rotation from a roster, honoring absences,
//! monthly fairness limits and pinned days, reconciles it with a shared
//! calendar, and reminds whoever is on duty.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`scheduler`] - Roster, fairness ledger and the rotation engine
//! - [`calendar`] - Schedule stores and absence sources (Google, local file, Opsgenie mirror)
//! - [`holidays`] - Public holiday and business-day rules
//! - [`notifications`] - Email, Slack and webhook reminders
//! - [`monitoring`] - Prometheus status file
//! - [`error`] - Unified error type
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use onduty::calendar::LocalCalendar;
//! use onduty::config::Config;
//! use onduty::scheduler::{Collaborators, GenerationWindow, RotationEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("onduty.toml".as_ref())?;
//!     let calendar = LocalCalendar::open(&config.calendar.local_file).await?;
//!     let holidays = config.holiday_calendar();
//!
//!     let mut engine = RotationEngine::new(config.roster()?, config.limits());
//!     let window = GenerationWindow::new(chrono::Local::now().date_naive(), config.generate_days);
//!     let report = engine
//!         .generate(&Collaborators::new(&calendar, &calendar, &holidays), &window)
//!         .await?;
//!     for day in &report.days {
//!         println!("{day}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod config;
pub mod error;
pub mod holidays;
pub mod monitoring;
pub mod notifications;
pub mod scheduler;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::calendar::{AbsenceSource, CommitStatus, DutyEntry, ScheduleStore};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, OndutyErrorTrait, Result};
    pub use crate::notifications::{NotificationManager, Urgency};
    pub use crate::scheduler::{
        Assignee, Collaborators, GenerationReport, GenerationWindow, Person, Roster,
        RotationEngine,
    };
}

// Direct re-exports for convenience
pub use scheduler::{Assignee, Person, Roster, RotationEngine};
