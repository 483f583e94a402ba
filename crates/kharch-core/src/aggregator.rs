//! Reduces an expense snapshot into per-participant paid/owed totals.

use kharch_domain::{Amounted, Expense, LedgerTotals, PaidOwed, Roster, UNKNOWN_PARTICIPANT};
use tracing::debug;

/// Folds expenses into [`LedgerTotals`].
///
/// Roster participants always appear, in roster order, even with no activity.
/// Payers and members outside the roster are appended as implicit participants
/// in first-seen order. Aggregation never fails: non-finite or missing amounts
/// count as zero.
pub struct LedgerAggregator;

impl LedgerAggregator {
    pub fn aggregate(expenses: &[Expense], roster: &Roster) -> LedgerTotals {
        let mut totals: LedgerTotals = roster
            .names()
            .map(|name| (name.to_string(), PaidOwed::default()))
            .collect();

        for expense in expenses {
            let payer = participant_key(roster, &expense.payer);
            totals.entry(payer).or_default().paid += expense.amount();

            for member in &expense.members {
                let key = participant_key(roster, &member.participant);
                totals.entry(key).or_default().owed += member.amount();
            }
        }

        let implicit = totals.len().saturating_sub(roster.len());
        debug!(
            expenses = expenses.len(),
            participants = totals.len(),
            implicit,
            "aggregated ledger totals"
        );
        totals
    }
}

fn participant_key(roster: &Roster, reference: &str) -> String {
    let name = roster.canonical_name(reference);
    if name.is_empty() {
        UNKNOWN_PARTICIPANT.to_string()
    } else {
        name
    }
}
