//! Plain-text rendering of settlement reports and dashboard stats.

use colored::Colorize;
use kharch_core::{
    format::{balance_lines, settlement_lines, CurrencyFormatter},
    SettlementReport,
};
use kharch_domain::{ExpenseStats, Standing};

/// Balances, transfers and data-quality warnings as printable lines.
pub fn render_report(
    report: &SettlementReport,
    formatter: &dyn CurrencyFormatter,
    epsilon: f64,
) -> String {
    let mut out = Vec::new();

    out.push("Balances".bold().to_string());
    if report.balances.is_empty() {
        out.push("  No participants yet.".to_string());
    }
    let lines = balance_lines(&report.balances, formatter, epsilon);
    for (entry, line) in report.balances.iter().zip(lines) {
        let styled = match entry.standing(epsilon) {
            Standing::Creditor => line.as_str().green(),
            Standing::Debtor => line.as_str().red(),
            Standing::Settled => line.as_str().normal(),
        };
        out.push(format!("  {styled}"));
    }

    out.push(String::new());
    out.push("Settlement".bold().to_string());
    for line in settlement_lines(&report.plan, formatter) {
        out.push(format!("  {line}"));
    }

    if !report.warnings.is_empty() {
        out.push(String::new());
        out.push("Warnings".bold().yellow().to_string());
        for warning in &report.warnings {
            out.push(format!("  {warning}"));
        }
    }

    out.join("\n")
}

pub fn render_stats(stats: &ExpenseStats, formatter: &dyn CurrencyFormatter) -> String {
    let mut out = vec![
        "Overview".bold().to_string(),
        format!("  Total spent: {}", formatter.format_amount(stats.total_spent)),
        format!("  Expenses: {}", stats.expense_count),
        format!(
            "  Pending: {}, Partial Paid: {}, Paid: {}",
            stats.payment_counts.pending, stats.payment_counts.partial, stats.payment_counts.paid
        ),
    ];

    out.push(String::new());
    out.push("By category".bold().to_string());
    for (category, amount) in &stats.by_category {
        out.push(format!("  {category}: {}", formatter.format_amount(*amount)));
    }

    out.push(String::new());
    out.push("By payer".bold().to_string());
    for (payer, amount) in &stats.by_payer {
        out.push(format!("  {payer}: {}", formatter.format_amount(*amount)));
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use kharch_core::format::{SymbolFormatter, SETTLED_MESSAGE};
    use kharch_domain::{LedgerEntry, PaidOwed, SettlementPlan, Transfer, SETTLEMENT_EPSILON};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn report_lists_balances_then_transfers() {
        plain();
        let report = SettlementReport {
            balances: vec![
                LedgerEntry::from_totals("A", PaidOwed { paid: 2500.0, owed: 1250.0 }),
                LedgerEntry::from_totals("B", PaidOwed { paid: 0.0, owed: 1250.0 }),
            ],
            plan: SettlementPlan::new(vec![Transfer::new("B", "A", 1250.0)]),
            warnings: Vec::new(),
        };
        let text = render_report(&report, &SymbolFormatter::default(), SETTLEMENT_EPSILON);
        assert!(text.contains("A: paid ₹2500.00, share ₹1250.00, balance ₹1250.00 (Gets back)"));
        assert!(text.contains("B owes ₹1250.00 to A"));
        assert!(!text.contains("Warnings"));
    }

    #[test]
    fn empty_report_is_settled() {
        plain();
        let report = SettlementReport {
            balances: Vec::new(),
            plan: SettlementPlan::default(),
            warnings: Vec::new(),
        };
        let text = render_report(&report, &SymbolFormatter::default(), SETTLEMENT_EPSILON);
        assert!(text.contains("No participants yet."));
        assert!(text.contains(SETTLED_MESSAGE));
    }

    #[test]
    fn stats_render_totals() {
        plain();
        let mut stats = ExpenseStats {
            total_spent: 3700.0,
            expense_count: 2,
            ..ExpenseStats::default()
        };
        stats.by_category.insert("Food".into(), 2500.0);
        let text = render_stats(&stats, &SymbolFormatter::new("$"));
        assert!(text.contains("Total spent: $3700.00"));
        assert!(text.contains("Food: $2500.00"));
    }
}
