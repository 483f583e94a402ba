//! Domain models for shared expenses and their member splits.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// One member's portion of an expense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberShare {
    #[serde(alias = "name")]
    pub participant: String,
    #[serde(default, alias = "amount", with = "crate::common::lenient_amount")]
    pub share_amount: f64,
}

impl MemberShare {
    pub fn new(participant: impl Into<String>, share_amount: f64) -> Self {
        Self {
            participant: participant.into(),
            share_amount,
        }
    }
}

impl Amounted for MemberShare {
    fn amount(&self) -> f64 {
        finite_or_zero(self.share_amount)
    }
}

/// A shared expense as persisted by the document store.
///
/// Every field tolerates being absent so partially written documents still
/// load. Missing or `null` amounts read as zero. A missing `id` reads as the
/// nil UUID; stores assign a real one before handing the expense out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "crate::common::lenient_amount")]
    pub total_amount: f64,
    #[serde(default = "Expense::default_category")]
    pub category: String,
    #[serde(default, alias = "addedBy")]
    pub payer: String,
    #[serde(default)]
    pub members: Vec<MemberShare>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, with = "crate::common::lenient_amount")]
    pub paid_amount: f64,
    #[serde(default)]
    pub paid_by: String,
}

impl Expense {
    pub fn new(
        description: impl Into<String>,
        total_amount: f64,
        category: impl Into<String>,
        payer: impl Into<String>,
        members: Vec<MemberShare>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            total_amount,
            category: category.into(),
            payer: payer.into(),
            members,
            created_at: Utc::now(),
            payment_status: PaymentStatus::Pending,
            paid_amount: 0.0,
            paid_by: String::new(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn default_category() -> String {
        DEFAULT_CATEGORY.into()
    }

    /// Category used for reporting; blank categories fall back to [`DEFAULT_CATEGORY`].
    pub fn category_label(&self) -> &str {
        let trimmed = self.category.trim();
        if trimmed.is_empty() {
            DEFAULT_CATEGORY
        } else {
            trimmed
        }
    }

    /// Sum of all member shares, ignoring non-finite values.
    pub fn split_total(&self) -> f64 {
        self.members.iter().map(Amounted::amount).sum()
    }

    /// Signed gap between the expense total and its member shares.
    pub fn split_discrepancy(&self) -> f64 {
        self.amount() - self.split_total()
    }

    /// Returns `true` when the member shares account for the total within `epsilon`.
    pub fn has_balanced_split(&self, epsilon: f64) -> bool {
        is_negligible(self.split_discrepancy(), epsilon)
    }

    /// Outstanding amount not yet covered by recorded payments.
    pub fn outstanding_amount(&self) -> f64 {
        match self.payment_status {
            PaymentStatus::Paid => 0.0,
            _ => (self.amount() - finite_or_zero(self.paid_amount)).max(0.0),
        }
    }
}

impl Identifiable for Expense {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Amounted for Expense {
    fn amount(&self) -> f64 {
        finite_or_zero(self.total_amount)
    }
}

impl Displayable for Expense {
    fn display_label(&self) -> String {
        format!(
            "{} [{}] {:.2} ({})",
            self.description,
            self.category_label(),
            self.amount(),
            self.payment_status
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
/// Enumerates how far an expense has been paid back.
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Whether `paid_by` is meaningful for this status.
    pub fn records_payer(self) -> bool {
        matches!(self, PaymentStatus::Partial | PaymentStatus::Paid)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Partial => "Partial Paid",
            PaymentStatus::Paid => "Paid",
        };
        f.write_str(label)
    }
}
