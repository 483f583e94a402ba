//! Reporting boundary: balance summaries and settlement plans for presentation.

use indexmap::IndexMap;
use kharch_domain::{
    Balances, ExpenseStats, ExpenseWarning, LedgerEntry, LedgerSnapshot, SettlementPlan,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    audit::expense_warnings, BalanceService, LedgerAggregator, SettlementEngine, StatsService,
};

/// Everything the settlement screen renders, computed from one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementReport {
    pub balances: Vec<LedgerEntry>,
    pub plan: SettlementPlan,
    #[serde(default)]
    pub warnings: Vec<ExpenseWarning>,
}

impl SettlementReport {
    pub fn is_settled(&self) -> bool {
        self.plan.is_settled()
    }
}

/// Derived views over a [`LedgerSnapshot`].
///
/// Holds no state besides the settlement tolerance; every call recomputes
/// from the snapshot, so repeated calls on the same input return identical
/// results, including transfer order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryService {
    engine: SettlementEngine,
}

impl SummaryService {
    pub fn new(engine: SettlementEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> SettlementEngine {
        self.engine
    }

    /// Paid, owed and net balance per participant, in roster order.
    pub fn balance_summary(&self, snapshot: &LedgerSnapshot) -> IndexMap<String, LedgerEntry> {
        let totals = LedgerAggregator::aggregate(&snapshot.expenses, &snapshot.roster);
        BalanceService::ledger_entries(&totals)
            .into_iter()
            .map(|entry| (entry.participant.clone(), entry))
            .collect()
    }

    /// Net balance per participant.
    pub fn balances(&self, snapshot: &LedgerSnapshot) -> Balances {
        let totals = LedgerAggregator::aggregate(&snapshot.expenses, &snapshot.roster);
        BalanceService::compute_balances(&totals)
    }

    /// Ordered transfers that settle the snapshot; empty when fully settled.
    pub fn settlement_plan(&self, snapshot: &LedgerSnapshot) -> SettlementPlan {
        self.engine.solve(&self.balances(snapshot))
    }

    pub fn warnings(&self, snapshot: &LedgerSnapshot) -> Vec<ExpenseWarning> {
        expense_warnings(&snapshot.expenses, self.engine.epsilon())
    }

    pub fn stats(&self, snapshot: &LedgerSnapshot) -> ExpenseStats {
        StatsService::collect(snapshot)
    }

    /// Balances, plan and warnings from a single aggregation pass.
    pub fn report(&self, snapshot: &LedgerSnapshot) -> SettlementReport {
        let totals = LedgerAggregator::aggregate(&snapshot.expenses, &snapshot.roster);
        let balances = BalanceService::compute_balances(&totals);
        let plan = self.engine.solve(&balances);
        let warnings = self.warnings(snapshot);
        debug!(
            participants = totals.len(),
            transfers = plan.len(),
            warnings = warnings.len(),
            "settlement report built"
        );
        SettlementReport {
            balances: BalanceService::ledger_entries(&totals),
            plan,
            warnings,
        }
    }
}
