use kharch_domain::{round_cents, LedgerEntry, SettlementPlan};

/// Message shown when the plan contains no transfers.
pub const SETTLED_MESSAGE: &str = "All settled up! No payments needed.";

/// Formats currency amounts for presentation.
pub trait CurrencyFormatter: Send + Sync {
    fn format_amount(&self, amount: f64) -> String;
}

/// Prefixes a currency symbol and rounds to two decimals, e.g. `₹1250.00`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolFormatter {
    symbol: String,
}

impl SymbolFormatter {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }
}

impl Default for SymbolFormatter {
    fn default() -> Self {
        Self::new("₹")
    }
}

impl CurrencyFormatter for SymbolFormatter {
    fn format_amount(&self, amount: f64) -> String {
        let rounded = round_cents(amount);
        // avoid printing "-0.00"
        let rounded = if rounded == 0.0 { 0.0 } else { rounded };
        if rounded < 0.0 {
            format!("-{}{:.2}", self.symbol, -rounded)
        } else {
            format!("{}{:.2}", self.symbol, rounded)
        }
    }
}

/// "X owes Y ₹Z" statements, or the settled message for an empty plan.
pub fn settlement_lines(plan: &SettlementPlan, formatter: &dyn CurrencyFormatter) -> Vec<String> {
    if plan.is_settled() {
        return vec![SETTLED_MESSAGE.to_string()];
    }
    plan.iter()
        .map(|transfer| {
            format!(
                "{} owes {} to {}",
                transfer.from,
                formatter.format_amount(transfer.amount),
                transfer.to
            )
        })
        .collect()
}

/// One line per participant: paid, share and net balance.
pub fn balance_lines(
    entries: &[LedgerEntry],
    formatter: &dyn CurrencyFormatter,
    epsilon: f64,
) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}: paid {}, share {}, balance {} ({})",
                entry.participant,
                formatter.format_amount(entry.total_paid),
                formatter.format_amount(entry.total_owed),
                formatter.format_amount(entry.balance),
                entry.standing(epsilon)
            )
        })
        .collect()
}
