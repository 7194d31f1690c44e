//! Greedy round-robin selection
//!
//! The selector walks the roster in `order` sequence starting after the
//! last assigned person and picks the first candidate that is not
//! unavailable. On non-workdays the walk starts one step earlier so the
//! previous assignee keeps the duty.
//!
//! When there is no roster anchor (the last assignee was the shadow or a
//! code outside the roster) the start position is drawn from a ChaCha8
//! generator, seedable for reproducible runs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::availability::UnavailableSet;
use super::roster::{Assignee, Roster};

/// Picks the next on-call person
#[derive(Debug, Clone)]
pub struct RotationSelector {
    rng: ChaCha8Rng,
}

impl RotationSelector {
    /// Create a selector seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Create a selector with a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Select the assignee following `last`
    ///
    /// An anchor without a roster position (the shadow, or a code that is
    /// not in the roster) does not fall back to order 0: the walk starts at
    /// a random position drawn from the selector's generator.
    pub fn select_next(
        &mut self,
        roster: &Roster,
        unavailable: &UnavailableSet,
        last: &Assignee,
        workday: bool,
    ) -> Assignee {
        if unavailable.covers(roster) {
            return roster.shadow();
        }

        let size = roster.size();
        let mut index = match last.order() {
            Some(order) if order < size => order,
            _ => self.rng.gen_range(0..size),
        };

        if !workday {
            index = (index as i64 - 1).rem_euclid(size as i64) as usize;
        }

        for _ in 0..size {
            index = (index + 1) % size;
            if let Some(person) = roster.by_order(index) {
                if !unavailable.contains(&person.code) {
                    return Assignee::Oncaller(person.clone());
                }
            }
        }

        // Unreachable while the set does not cover the roster.
        roster.shadow()
    }
}

impl Default for RotationSelector {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
