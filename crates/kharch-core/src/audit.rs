use kharch_domain::{Amounted, Expense, ExpenseWarning, Identifiable};
use tracing::warn;

/// Detects expenses whose member shares do not add up to the expense total.
///
/// Flagged expenses still take part in aggregation; the warnings only tell the
/// caller that balances will not net to zero.
pub fn expense_warnings(expenses: &[Expense], epsilon: f64) -> Vec<ExpenseWarning> {
    let mut warnings = Vec::new();
    for expense in expenses {
        if expense.has_balanced_split(epsilon) {
            continue;
        }
        let warning = ExpenseWarning {
            expense_id: expense.id(),
            description: expense.description.clone(),
            total_amount: expense.amount(),
            split_total: expense.split_total(),
        };
        warn!(
            expense = %warning.expense_id,
            total = warning.total_amount,
            split = warning.split_total,
            "expense shares do not match its total"
        );
        warnings.push(warning);
    }
    warnings
}
