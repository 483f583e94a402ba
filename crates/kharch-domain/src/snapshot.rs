//! Immutable input handed to the settlement pipeline.

use serde::{Deserialize, Serialize};

use crate::{expense::Expense, participant::Roster};

/// A complete, point-in-time copy of the roster and expense collections.
///
/// Settlement views are always recomputed from a fresh snapshot rather than
/// updated incrementally.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub roster: Roster,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl LedgerSnapshot {
    pub fn new(roster: Roster, expenses: Vec<Expense>) -> Self {
        Self { roster, expenses }
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }
}
