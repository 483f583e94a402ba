use kharch_domain::{Balances, LedgerEntry, LedgerTotals};

/// Derives net balances (paid − owed) from aggregated totals.
///
/// Balances keep full precision; rounding belongs to presentation.
pub struct BalanceService;

impl BalanceService {
    pub fn compute_balances(totals: &LedgerTotals) -> Balances {
        totals
            .iter()
            .map(|(name, entry)| (name.clone(), entry.balance()))
            .collect()
    }

    /// Summary rows in the same order as `totals`.
    pub fn ledger_entries(totals: &LedgerTotals) -> Vec<LedgerEntry> {
        totals
            .iter()
            .map(|(name, entry)| LedgerEntry::from_totals(name.clone(), *entry))
            .collect()
    }

    /// Grand total of all balances; zero (within epsilon) for well-formed splits.
    pub fn net_total(balances: &Balances) -> f64 {
        balances.values().sum()
    }
}
