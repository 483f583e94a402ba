//! Greedy debt matching that turns net balances into suggested payments.

use kharch_domain::{finite_or_zero, Balances, SettlementPlan, Transfer, SETTLEMENT_EPSILON};
use tracing::debug;

use crate::CoreError;

/// Matches debtors to creditors until every balance is within epsilon of zero.
///
/// Each round pays the smallest outstanding debt towards the largest
/// outstanding credit. Equal amounts keep their roster order, so the same
/// balances always yield the same plan. This is the usual greedy heuristic; it
/// does not search for the minimum possible number of transfers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementEngine {
    epsilon: f64,
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self {
            epsilon: SETTLEMENT_EPSILON,
        }
    }
}

#[derive(Debug)]
struct Position<'a> {
    name: &'a str,
    order: usize,
    remaining: f64,
}

impl SettlementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom tolerance. The tolerance must be a positive finite number,
    /// otherwise exhausted positions would never leave the matching loop.
    pub fn with_epsilon(epsilon: f64) -> Result<Self, CoreError> {
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(CoreError::Validation(format!(
                "settlement epsilon must be a positive number, got {epsilon}"
            )));
        }
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn solve(&self, balances: &Balances) -> SettlementPlan {
        let mut debtors = Vec::new();
        let mut creditors = Vec::new();
        for (order, (name, balance)) in balances.iter().enumerate() {
            let balance = finite_or_zero(*balance);
            if balance < -self.epsilon {
                debtors.push(Position {
                    name: name.as_str(),
                    order,
                    remaining: -balance,
                });
            } else if balance > self.epsilon {
                creditors.push(Position {
                    name: name.as_str(),
                    order,
                    remaining: balance,
                });
            }
        }

        let mut transfers = Vec::with_capacity(debtors.len() + creditors.len());
        while !debtors.is_empty() && !creditors.is_empty() {
            debtors.sort_by(|a, b| {
                a.remaining
                    .total_cmp(&b.remaining)
                    .then(a.order.cmp(&b.order))
            });
            creditors.sort_by(|a, b| {
                b.remaining
                    .total_cmp(&a.remaining)
                    .then(a.order.cmp(&b.order))
            });

            let debtor = &mut debtors[0];
            let creditor = &mut creditors[0];
            let amount = debtor.remaining.min(creditor.remaining);
            transfers.push(Transfer::new(debtor.name, creditor.name, amount));

            debtor.remaining -= amount;
            creditor.remaining -= amount;
            let debtor_done = debtor.remaining < self.epsilon;
            let creditor_done = creditor.remaining < self.epsilon;
            if debtor_done {
                debtors.remove(0);
            }
            if creditor_done {
                creditors.remove(0);
            }
        }

        if !debtors.is_empty() || !creditors.is_empty() {
            debug!(
                debtors = debtors.len(),
                creditors = creditors.len(),
                "balances did not net to zero; leaving remainder unsettled"
            );
        }
        debug!(transfers = transfers.len(), "settlement plan computed");
        SettlementPlan::new(transfers)
    }
}
