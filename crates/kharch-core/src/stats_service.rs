use kharch_domain::{Amounted, ExpenseStats, LedgerSnapshot, PaymentStatus, UNKNOWN_PARTICIPANT};

/// Dashboard statistics: spend per category and per payer, payment progress.
pub struct StatsService;

impl StatsService {
    pub fn collect(snapshot: &LedgerSnapshot) -> ExpenseStats {
        let mut stats = ExpenseStats::default();
        for expense in &snapshot.expenses {
            let amount = expense.amount();
            stats.total_spent += amount;
            stats.expense_count += 1;
            *stats
                .by_category
                .entry(expense.category_label().to_string())
                .or_insert(0.0) += amount;

            let payer = snapshot.roster.canonical_name(&expense.payer);
            let payer = if payer.is_empty() {
                UNKNOWN_PARTICIPANT.to_string()
            } else {
                payer
            };
            *stats.by_payer.entry(payer).or_insert(0.0) += amount;

            match expense.payment_status {
                PaymentStatus::Pending => stats.payment_counts.pending += 1,
                PaymentStatus::Partial => stats.payment_counts.partial += 1,
                PaymentStatus::Paid => stats.payment_counts.paid += 1,
            }
        }
        stats
    }
}
