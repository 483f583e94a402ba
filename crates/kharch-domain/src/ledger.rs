//! Derived ledger views: per-participant totals, balances and transfers.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// Running totals for one participant while aggregating expenses.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PaidOwed {
    pub paid: f64,
    pub owed: f64,
}

impl PaidOwed {
    pub fn balance(&self) -> f64 {
        self.paid - self.owed
    }
}

/// Paid/owed totals keyed by canonical participant name, in roster order.
pub type LedgerTotals = IndexMap<String, PaidOwed>;

/// Net balances keyed by canonical participant name, in roster order.
pub type Balances = IndexMap<String, f64>;

/// Per-participant summary row handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub participant: String,
    pub total_paid: f64,
    pub total_owed: f64,
    pub balance: f64,
}

impl LedgerEntry {
    pub fn from_totals(participant: impl Into<String>, totals: PaidOwed) -> Self {
        Self {
            participant: participant.into(),
            total_paid: totals.paid,
            total_owed: totals.owed,
            balance: totals.balance(),
        }
    }

    pub fn standing(&self, epsilon: f64) -> Standing {
        if self.balance > epsilon {
            Standing::Creditor
        } else if self.balance < -epsilon {
            Standing::Debtor
        } else {
            Standing::Settled
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Which side of the settlement a participant falls on.
pub enum Standing {
    /// Is owed money.
    Creditor,
    /// Owes money.
    Debtor,
    Settled,
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Standing::Creditor => "Gets back",
            Standing::Debtor => "Owes",
            Standing::Settled => "Settled",
        };
        f.write_str(label)
    }
}

/// A suggested payment from a debtor to a creditor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: f64,
}

impl Transfer {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }
}

impl Amounted for Transfer {
    fn amount(&self) -> f64 {
        self.amount
    }
}

impl Displayable for Transfer {
    fn display_label(&self) -> String {
        format!("{} owes {} {:.2}", self.from, self.to, self.amount)
    }
}

/// Ordered transfers that settle every outstanding balance.
///
/// An empty plan means the group is fully settled.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SettlementPlan {
    pub transfers: Vec<Transfer>,
}

impl SettlementPlan {
    pub fn new(transfers: Vec<Transfer>) -> Self {
        Self { transfers }
    }

    pub fn is_settled(&self) -> bool {
        self.transfers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transfer> {
        self.transfers.iter()
    }

    pub fn total_transferred(&self) -> f64 {
        self.transfers.iter().map(|t| t.amount).sum()
    }

    /// Applies every transfer to `balances`, as if the payments had been made.
    pub fn apply_to(&self, balances: &Balances) -> Balances {
        let mut settled = balances.clone();
        for transfer in &self.transfers {
            *settled.entry(transfer.from.clone()).or_insert(0.0) += transfer.amount;
            *settled.entry(transfer.to.clone()).or_insert(0.0) -= transfer.amount;
        }
        settled
    }
}

impl<'a> IntoIterator for &'a SettlementPlan {
    type Item = &'a Transfer;
    type IntoIter = std::slice::Iter<'a, Transfer>;

    fn into_iter(self) -> Self::IntoIter {
        self.transfers.iter()
    }
}

/// Data-quality finding for an expense whose shares disagree with its total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseWarning {
    pub expense_id: Uuid,
    pub description: String,
    pub total_amount: f64,
    pub split_total: f64,
}

impl ExpenseWarning {
    pub fn discrepancy(&self) -> f64 {
        self.total_amount - self.split_total
    }
}

impl fmt::Display for ExpenseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expense `{}` ({}) splits {:.2} of {:.2}",
            self.description, self.expense_id, self.split_total, self.total_amount
        )
    }
}

/// Number of expenses in each payment state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentStatusCounts {
    pub pending: usize,
    pub partial: usize,
    pub paid: usize,
}

/// Dashboard statistics over an expense snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExpenseStats {
    pub total_spent: f64,
    pub expense_count: usize,
    pub by_category: IndexMap<String, f64>,
    pub by_payer: IndexMap<String, f64>,
    pub payment_counts: PaymentStatusCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_standing_respects_epsilon() {
        let entry = LedgerEntry::from_totals(
            "A",
            PaidOwed {
                paid: 10.0,
                owed: 10.009,
            },
        );
        assert_eq!(entry.standing(SETTLEMENT_EPSILON), Standing::Settled);

        let entry = LedgerEntry::from_totals(
            "B",
            PaidOwed {
                paid: 0.0,
                owed: 1250.0,
            },
        );
        assert_eq!(entry.standing(SETTLEMENT_EPSILON), Standing::Debtor);
        assert_eq!(entry.balance, -1250.0);
    }

    #[test]
    fn applying_plan_moves_money_from_debtor_to_creditor() {
        let balances: Balances = [("A".to_string(), 1250.0), ("B".to_string(), -1250.0)]
            .into_iter()
            .collect();
        let plan = SettlementPlan::new(vec![Transfer::new("B", "A", 1250.0)]);
        let settled = plan.apply_to(&balances);
        assert!(settled.values().all(|b| b.abs() < 1e-9));
        assert!(!plan.is_settled());
        assert!(SettlementPlan::default().is_settled());
    }

    #[test]
    fn transfer_label_rounds_only_for_display() {
        let transfer = Transfer::new("C", "A", 100.0 / 3.0);
        assert_eq!(transfer.display_label(), "C owes A 33.33");
        assert!(transfer.amount > 33.33);
    }
}
