//! Evaluation context model.
//!
//! The context carries the runtime facts a rule is evaluated against. It is
//! constructed fresh for every evaluation call and never persisted.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The runtime facts evaluated against a rule's conditions.
///
/// Optional facts that are absent cannot satisfy a clause that refers to
/// them: a rule requiring `customerTier = VIP` does not match a context
/// without a tier.
///
/// # Example
///
/// ```
/// use commerce_rules::models::EvaluationContext;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let at = NaiveDate::from_ymd_opt(2026, 1, 17).unwrap().and_hms_opt(9, 30, 0).unwrap();
/// let context = EvaluationContext::new(Decimal::new(12000, 2), at).with_customer_tier("VIP");
/// assert_eq!(context.customer_tier.as_deref(), Some("VIP"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// The order value (subtotal) used for range clauses and percentages.
    pub amount: Decimal,
    /// The order total, used by `percentageOfTotal` rules.
    #[serde(default)]
    pub total: Option<Decimal>,
    /// The customer's tier (e.g. "VIP", "regular").
    #[serde(default)]
    pub customer_tier: Option<String>,
    /// The customer's lifetime value.
    #[serde(default)]
    pub lifetime_value: Option<Decimal>,
    /// The local date and time of the evaluation.
    pub at: NaiveDateTime,
    /// The violation score of the order or customer.
    #[serde(default)]
    pub violation_score: Option<Decimal>,
    /// The charge type being priced.
    #[serde(default)]
    pub charge_type: Option<String>,
    /// The quote stage of the order.
    #[serde(default)]
    pub quote_stage: Option<String>,
}

impl EvaluationContext {
    /// Creates a context with only the order value and time set.
    pub fn new(amount: Decimal, at: NaiveDateTime) -> Self {
        Self {
            amount,
            total: None,
            customer_tier: None,
            lifetime_value: None,
            at,
            violation_score: None,
            charge_type: None,
            quote_stage: None,
        }
    }

    /// Sets the order total.
    pub fn with_total(mut self, total: Decimal) -> Self {
        self.total = Some(total);
        self
    }

    /// Sets the customer tier.
    pub fn with_customer_tier(mut self, tier: impl Into<String>) -> Self {
        self.customer_tier = Some(tier.into());
        self
    }

    /// Sets the customer lifetime value.
    pub fn with_lifetime_value(mut self, value: Decimal) -> Self {
        self.lifetime_value = Some(value);
        self
    }

    /// Sets the violation score.
    pub fn with_violation_score(mut self, score: Decimal) -> Self {
        self.violation_score = Some(score);
        self
    }

    /// Sets the charge type.
    pub fn with_charge_type(mut self, charge_type: impl Into<String>) -> Self {
        self.charge_type = Some(charge_type.into());
        self
    }

    /// Sets the quote stage.
    pub fn with_quote_stage(mut self, stage: impl Into<String>) -> Self {
        self.quote_stage = Some(stage.into());
        self
    }

    /// The base for `percentageOfTotal`: the total, or the amount when no
    /// total was supplied.
    pub fn total_or_amount(&self) -> Decimal {
        self.total.unwrap_or(self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 13)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_deserialize_minimal_context() {
        let json = r#"{ "amount": "49.95", "at": "2026-01-13T10:00:00" }"#;
        let context: EvaluationContext = serde_json::from_str(json).unwrap();
        assert_eq!(context.amount, Decimal::new(4995, 2));
        assert_eq!(context.at, at());
        assert!(context.customer_tier.is_none());
        assert!(context.total.is_none());
    }

    #[test]
    fn test_total_or_amount_falls_back_to_amount() {
        let context = EvaluationContext::new(Decimal::new(100, 0), at());
        assert_eq!(context.total_or_amount(), Decimal::new(100, 0));

        let context = context.with_total(Decimal::new(120, 0));
        assert_eq!(context.total_or_amount(), Decimal::new(120, 0));
    }

    #[test]
    fn test_builders_set_fields() {
        let context = EvaluationContext::new(Decimal::ONE, at())
            .with_lifetime_value(Decimal::new(5000, 0))
            .with_violation_score(Decimal::new(3, 0))
            .with_charge_type("collection")
            .with_quote_stage("approved");
        assert_eq!(context.lifetime_value, Some(Decimal::new(5000, 0)));
        assert_eq!(context.violation_score, Some(Decimal::new(3, 0)));
        assert_eq!(context.charge_type.as_deref(), Some("collection"));
        assert_eq!(context.quote_stage.as_deref(), Some("approved"));
    }
}
