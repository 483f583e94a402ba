//! Shared traits and numeric helpers for expense-sharing primitives.

use uuid::Uuid;

/// Tolerance below which a balance or remaining debt counts as zero.
pub const SETTLEMENT_EPSILON: f64 = 0.01;

/// Category applied to expenses recorded without one.
pub const DEFAULT_CATEGORY: &str = "Other";

/// Aggregation key used when a payer or member reference is blank.
pub const UNKNOWN_PARTICIPANT: &str = "Unknown";

/// Exposes a stable identifier for entities stored in the expense collection.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Supplies a common contract for retrieving numeric amounts.
pub trait Amounted {
    fn amount(&self) -> f64;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Replaces NaN and infinities with zero so aggregation never propagates them.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Returns `true` when `amount` is within `epsilon` of zero.
pub fn is_negligible(amount: f64, epsilon: f64) -> bool {
    amount.abs() <= epsilon
}

/// Rounds to whole cents. Only presentation code should call this.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Serde adapter for stored amounts. `null` reads as zero and non-finite
/// values are written as zero, so JSON documents always round-trip.
pub mod lenient_amount {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::finite_or_zero;

    pub fn serialize<S>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        finite_or_zero(*amount).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let amount = Option::<f64>::deserialize(deserializer)?;
        Ok(amount.map_or(0.0, finite_or_zero))
    }
}
