//! Request types for the commerce rule engine API.
//!
//! Rule bodies for create and update are plain [`RuleDraft`]s; the types
//! here cover evaluation requests.
//!
//! [`RuleDraft`]: crate::models::RuleDraft

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{EvaluationContext, RuleType};

/// Request body for `/evaluate/:rule_type` and `/rules/:rule_type/:id/test`.
///
/// Mirrors [`EvaluationContext`] except that `at` may be omitted, in which
/// case the server's current UTC time is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    /// The order value (subtotal).
    pub amount: Decimal,
    /// The order total.
    #[serde(default)]
    pub total: Option<Decimal>,
    /// The customer's tier.
    #[serde(default)]
    pub customer_tier: Option<String>,
    /// The customer's lifetime value.
    #[serde(default)]
    pub lifetime_value: Option<Decimal>,
    /// The local date and time to evaluate at.
    #[serde(default)]
    pub at: Option<NaiveDateTime>,
    /// The violation score.
    #[serde(default)]
    pub violation_score: Option<Decimal>,
    /// The charge type being priced.
    #[serde(default)]
    pub charge_type: Option<String>,
    /// The quote stage of the order.
    #[serde(default)]
    pub quote_stage: Option<String>,
}

impl EvaluateRequest {
    /// Converts the request into a context, using `now` when `at` is absent.
    pub fn into_context(self, now: NaiveDateTime) -> EvaluationContext {
        EvaluationContext {
            amount: self.amount,
            total: self.total,
            customer_tier: self.customer_tier,
            lifetime_value: self.lifetime_value,
            at: self.at.unwrap_or(now),
            violation_score: self.violation_score,
            charge_type: self.charge_type,
            quote_stage: self.quote_stage,
        }
    }
}

/// One item of a batch evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemRequest {
    /// The rule type to evaluate.
    pub rule_type: RuleType,
    /// The context to evaluate against.
    pub context: EvaluateRequest,
}

/// Request body for `/evaluate/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEvaluateRequest {
    /// The evaluations to run, answered in order.
    pub items: Vec<BatchItemRequest>,
}
