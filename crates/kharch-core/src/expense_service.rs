//! Producer-side expense intake: validation, equal splits, payment tracking and search.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use kharch_domain::{
    Amounted, Expense, MemberShare, PaymentStatus, Roster, DEFAULT_CATEGORY, SETTLEMENT_EPSILON,
};
use tracing::{debug, info};

use crate::CoreError;

/// User-entered fields for a new expense, prior to validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub description: String,
    pub total_amount: f64,
    pub category: String,
    pub payer: String,
    pub members: Vec<MemberShare>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ExpenseDraft {
    pub fn new(description: impl Into<String>, total_amount: f64, payer: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            total_amount,
            category: DEFAULT_CATEGORY.into(),
            payer: payer.into(),
            members: Vec::new(),
            created_at: None,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn member(mut self, participant: impl Into<String>, share_amount: f64) -> Self {
        self.members.push(MemberShare::new(participant, share_amount));
        self
    }

    /// Replaces the members with an equal split of the total across `names`.
    pub fn split_equally<I, S>(mut self, names: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let shares = ExpenseService::split_equally(self.total_amount, names.len())?;
        self.members = names
            .into_iter()
            .zip(shares)
            .map(|(name, share)| MemberShare::new(name, share))
            .collect();
        Ok(self)
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn into_expense(self) -> Result<Expense, CoreError> {
        ExpenseService::create(self)
    }
}

pub struct ExpenseService;

impl ExpenseService {
    /// Validates a draft and turns it into a pending expense.
    pub fn create(draft: ExpenseDraft) -> Result<Expense, CoreError> {
        Self::validate_draft(&draft)?;
        let members = draft
            .members
            .into_iter()
            .map(|member| MemberShare::new(member.participant.trim(), member.share_amount))
            .collect();
        let mut expense = Expense::new(
            draft.description.trim(),
            draft.total_amount,
            draft.category.trim(),
            draft.payer.trim(),
            members,
        );
        if let Some(created_at) = draft.created_at {
            expense.created_at = created_at;
        }
        info!(
            expense = %expense.id,
            total = expense.total_amount,
            members = expense.members.len(),
            "expense created"
        );
        Ok(expense)
    }

    pub fn validate_draft(draft: &ExpenseDraft) -> Result<(), CoreError> {
        if !draft.total_amount.is_finite() || draft.total_amount <= 0.0 {
            return Err(CoreError::Validation(format!(
                "expense amount must be positive, got {}",
                draft.total_amount
            )));
        }
        if draft.payer.trim().is_empty() {
            return Err(CoreError::Validation("expense payer is required".into()));
        }
        if draft.members.is_empty() {
            return Err(CoreError::Validation(
                "please add at least one member".into(),
            ));
        }
        for member in &draft.members {
            if member.participant.trim().is_empty() {
                return Err(CoreError::Validation("member name is required".into()));
            }
            if !member.share_amount.is_finite() || member.share_amount < 0.0 {
                return Err(CoreError::Validation(format!(
                    "share for `{}` must be a non-negative amount",
                    member.participant.trim()
                )));
            }
        }
        let split_total: f64 = draft.members.iter().map(Amounted::amount).sum();
        if (split_total - draft.total_amount).abs() > SETTLEMENT_EPSILON {
            return Err(CoreError::Validation(format!(
                "split total ({split_total:.2}) doesn't match expense amount ({:.2})",
                draft.total_amount
            )));
        }
        Ok(())
    }

    /// Splits `total` into `members` shares rounded to cents. Leftover cents go
    /// to the leading members so the shares add up to the total exactly.
    pub fn split_equally(total: f64, members: usize) -> Result<Vec<f64>, CoreError> {
        if !total.is_finite() || total <= 0.0 {
            return Err(CoreError::Validation(
                "please enter a valid total amount first".into(),
            ));
        }
        if members == 0 {
            return Err(CoreError::Validation("please add members first".into()));
        }
        let cents = (total * 100.0).round() as i64;
        let count = members as i64;
        let base = cents / count;
        let remainder = cents % count;
        let shares = (0..count)
            .map(|idx| {
                let share = if idx < remainder { base + 1 } else { base };
                share as f64 / 100.0
            })
            .collect();
        debug!(total, members, "split expense equally");
        Ok(shares)
    }

    /// Records how much of an expense has been paid back and by whom.
    ///
    /// `paid_by` is only stored for partial and paid statuses; a pending update
    /// leaves the previous value untouched.
    pub fn update_payment_status(
        expense: &mut Expense,
        status: PaymentStatus,
        paid_amount: f64,
        paid_by: &str,
    ) -> Result<(), CoreError> {
        if !paid_amount.is_finite() || paid_amount < 0.0 {
            return Err(CoreError::Validation(format!(
                "paid amount must be a non-negative number, got {paid_amount}"
            )));
        }
        if paid_amount > expense.amount() + SETTLEMENT_EPSILON {
            return Err(CoreError::Validation(format!(
                "paid amount {paid_amount:.2} exceeds expense total {:.2}",
                expense.amount()
            )));
        }
        expense.payment_status = status;
        expense.paid_amount = paid_amount;
        if status.records_payer() {
            expense.paid_by = paid_by.trim().to_string();
        }
        info!(expense = %expense.id, status = %status, paid_amount, "payment status updated");
        Ok(())
    }

    /// Case-insensitive search over description, category, payer and members.
    /// An empty term matches every expense.
    pub fn search<'a>(expenses: &'a [Expense], roster: &Roster, term: &str) -> Vec<&'a Expense> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return expenses.iter().collect();
        }
        expenses
            .iter()
            .filter(|expense| {
                let payer = roster.canonical_name(&expense.payer);
                let mut haystack = vec![
                    expense.description.as_str(),
                    expense.category_label(),
                    expense.payer.as_str(),
                    payer.as_str(),
                    expense.paid_by.as_str(),
                ];
                haystack.extend(expense.members.iter().map(|m| m.participant.as_str()));
                haystack
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Orders expenses newest first, matching the history view.
    pub fn sort_newest_first(expenses: &mut [Expense]) {
        expenses.sort_by_key(|expense| Reverse(expense.created_at));
    }
}
