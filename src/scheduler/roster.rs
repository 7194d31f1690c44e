//! Rotation roster and the shadow fallback
//!
//! The roster is the ordered list of people taking part in the rotation.
//! Each person has a dense `order` (their position in the sequence) and a
//! short `code`, usually their initials. A separate shadow code stands in
//! for "nobody is available" and never takes part in the rotation itself.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::error::{SchedulerError, SchedulerResult};

/// Shadow code used when none is configured
pub const DEFAULT_SHADOW_CODE: &str = "xx";

// ============================================================================
// Person
// ============================================================================

/// A person taking part in the rotation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Person {
    /// Position in the rotation sequence (0, 1, ...)
    pub order: usize,

    /// 2-3 character identification code (usually initials)
    pub code: String,

    /// Calendar account added as attendee to duty entries
    #[serde(default)]
    pub calendar_email: String,

    /// Address for reminder mails
    #[serde(default)]
    pub email: String,

    /// Slack user name or id for direct messages
    #[serde(default)]
    pub slack_id: String,
}

impl Person {
    /// Create a person with no contact endpoints
    pub fn new(order: usize, code: impl Into<String>) -> Self {
        Self {
            order,
            code: code.into(),
            calendar_email: String::new(),
            email: String::new(),
            slack_id: String::new(),
        }
    }

    /// Set the reminder mail address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Set the calendar attendee address
    pub fn with_calendar_email(mut self, email: impl Into<String>) -> Self {
        self.calendar_email = email.into();
        self
    }

    /// Set the Slack user
    pub fn with_slack_id(mut self, slack_id: impl Into<String>) -> Self {
        self.slack_id = slack_id.into();
        self
    }

    /// Whether the calendar address is usable as an attendee
    pub fn has_calendar_email(&self) -> bool {
        self.calendar_email.contains('@')
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

// ============================================================================
// Assignee
// ============================================================================

/// Whoever is recorded as on duty for a day
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Assignee {
    /// A roster member
    Oncaller(Person),

    /// The "nobody available" sentinel
    Shadow(String),

    /// A code found in the calendar that is not on the roster
    External(String),
}

impl Assignee {
    /// Lower-case code of the assignee
    pub fn code(&self) -> &str {
        match self {
            Self::Oncaller(person) => &person.code,
            Self::Shadow(code) | Self::External(code) => code,
        }
    }

    /// Roster position, if the assignee is a roster member
    pub fn order(&self) -> Option<usize> {
        match self {
            Self::Oncaller(person) => Some(person.order),
            _ => None,
        }
    }

    /// The roster member behind this assignee
    pub fn person(&self) -> Option<&Person> {
        match self {
            Self::Oncaller(person) => Some(person),
            _ => None,
        }
    }

    /// Check if this is the shadow sentinel
    pub fn is_shadow(&self) -> bool {
        matches!(self, Self::Shadow(_))
    }
}

impl fmt::Display for Assignee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Roster
// ============================================================================

/// Ordered set of oncallers, indexed by order and by code
#[derive(Debug, Clone)]
pub struct Roster {
    by_order: Vec<Person>,
    by_code: HashMap<String, usize>,
    shadow_code: String,
}

impl Roster {
    /// Build a roster, validating orders and codes
    ///
    /// Codes are normalized to lower case. Fails if the list is empty, if
    /// orders are not exactly `0..N`, if codes are duplicated or not 2-3
    /// word characters, or if a code collides with the shadow code.
    pub fn new(people: Vec<Person>, shadow_code: impl Into<String>) -> SchedulerResult<Self> {
        let shadow_code = shadow_code.into().trim().to_lowercase();
        if shadow_code.is_empty() {
            return Err(SchedulerError::invalid_roster("shadow code cannot be empty"));
        }

        if people.is_empty() {
            return Err(SchedulerError::invalid_roster("no oncallers configured"));
        }

        let size = people.len();
        let mut slots: Vec<Option<Person>> = vec![None; size];
        let mut by_code = HashMap::with_capacity(size);

        for mut person in people {
            person.code = person.code.trim().to_lowercase();

            if !is_valid_code(&person.code) {
                return Err(SchedulerError::invalid_roster(format!(
                    "code '{}' must be 2-3 letters, digits or underscores",
                    person.code
                )));
            }
            if person.code == shadow_code {
                return Err(SchedulerError::invalid_roster(format!(
                    "code '{}' is reserved for the shadow oncaller",
                    person.code
                )));
            }
            if person.order >= size {
                return Err(SchedulerError::invalid_roster(format!(
                    "order {} of '{}' is outside 0..{}",
                    person.order, person.code, size
                )));
            }
            if by_code.insert(person.code.clone(), person.order).is_some() {
                return Err(SchedulerError::invalid_roster(format!(
                    "duplicate code '{}'",
                    person.code
                )));
            }

            let order = person.order;
            let slot = &mut slots[order];
            if let Some(existing) = slot {
                return Err(SchedulerError::invalid_roster(format!(
                    "order {} used by both '{}' and '{}'",
                    order, existing.code, person.code
                )));
            }
            *slot = Some(person);
        }

        // Every slot is filled: N people, N distinct orders in 0..N.
        let by_order = slots.into_iter().flatten().collect();

        Ok(Self {
            by_order,
            by_code,
            shadow_code,
        })
    }

    /// Person at a rotation position
    pub fn by_order(&self, order: usize) -> Option<&Person> {
        self.by_order.get(order)
    }

    /// Person with a code (case-insensitive)
    pub fn by_code(&self, code: &str) -> Option<&Person> {
        self.by_code
            .get(&code.to_lowercase())
            .and_then(|&order| self.by_order.get(order))
    }

    /// Number of roster members
    pub fn size(&self) -> usize {
        self.by_order.len()
    }

    /// All members in rotation order
    pub fn people(&self) -> &[Person] {
        &self.by_order
    }

    /// Member with order 0
    pub fn first(&self) -> &Person {
        // The constructor rejects empty rosters.
        &self.by_order[0]
    }

    /// All codes in rotation order
    pub fn codes(&self) -> Vec<String> {
        self.by_order.iter().map(|p| p.code.clone()).collect()
    }

    /// The shadow code
    pub fn shadow_code(&self) -> &str {
        &self.shadow_code
    }

    /// The shadow assignee
    pub fn shadow(&self) -> Assignee {
        Assignee::Shadow(self.shadow_code.clone())
    }

    /// Map a recorded code to an assignee
    pub fn resolve(&self, code: &str) -> Assignee {
        let code = code.trim().to_lowercase();
        if code == self.shadow_code {
            return self.shadow();
        }
        match self.by_code(&code) {
            Some(person) => Assignee::Oncaller(person.clone()),
            None => Assignee::External(code),
        }
    }

    /// Look up a roster member or the shadow, failing for anything else
    pub fn lookup(&self, code: &str) -> SchedulerResult<Assignee> {
        match self.resolve(code) {
            Assignee::External(code) => {
                let mut options = self.codes();
                options.push(self.shadow_code.clone());
                Err(SchedulerError::unknown_oncaller(code, options))
            }
            assignee => Ok(assignee),
        }
    }
}

fn is_valid_code(code: &str) -> bool {
    let len = code.chars().count();
    (2..=3).contains(&len) && code.chars().all(|c| c.is_alphanumeric() || c == '_')
}

// ============================================================================
// Tests
// ============================================================================
