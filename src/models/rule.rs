//! Rule model and related types.
//!
//! A [`Rule`] is an admin-configured record expressing "when conditions X
//! hold, apply outcome Y". Conditions and calculation parameters are stored
//! as flat camelCase key/value blobs so existing stored data keeps its key
//! names; unknown keys are rejected at deserialization.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::RuleType;

/// A raw scalar stored for a condition clause.
///
/// Clause values are kept as entered by the administrator and only parsed
/// into their expected type when a rule is matched, so one malformed value
/// makes its clause fail closed instead of breaking rule loading.
///
/// # Example
///
/// ```
/// use commerce_rules::models::ClauseValue;
/// use rust_decimal::Decimal;
///
/// let value: ClauseValue = serde_json::from_str("\"25.50\"").unwrap();
/// assert_eq!(value.as_decimal(), Some(Decimal::new(2550, 2)));
///
/// let value: ClauseValue = serde_json::from_str("\"abc\"").unwrap();
/// assert_eq!(value.as_decimal(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClauseValue {
    /// A boolean value.
    Bool(bool),
    /// A numeric value.
    Number(serde_json::Number),
    /// A text value.
    Text(String),
}

impl ClauseValue {
    /// Interprets the value as a decimal number.
    ///
    /// Numbers and numeric text both parse; booleans and non-numeric text
    /// return `None`.
    pub fn as_decimal(&self) -> Option<Decimal> {
        let raw = match self {
            ClauseValue::Number(n) => n.to_string(),
            ClauseValue::Text(s) => s.trim().to_string(),
            ClauseValue::Bool(_) => return None,
        };
        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .ok()
    }

    /// Interprets the value as text for exact-match comparisons.
    ///
    /// Numbers are rendered in their stored form; booleans return `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            ClauseValue::Text(s) => Some(s.clone()),
            ClauseValue::Number(n) => Some(n.to_string()),
            ClauseValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for ClauseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseValue::Bool(b) => write!(f, "{}", b),
            ClauseValue::Number(n) => write!(f, "{}", n),
            ClauseValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ClauseValue {
    fn from(value: &str) -> Self {
        ClauseValue::Text(value.to_string())
    }
}

impl From<i64> for ClauseValue {
    fn from(value: i64) -> Self {
        ClauseValue::Number(value.into())
    }
}

impl From<Decimal> for ClauseValue {
    fn from(value: Decimal) -> Self {
        ClauseValue::Text(value.to_string())
    }
}

/// The predicate clauses of a rule.
///
/// All present clauses are implicitly AND-ed; an absent clause is a
/// wildcard. A rule with no clauses at all matches every context, which is
/// how a "global" rule is expressed. Field order is evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuleConditions {
    /// Inclusive lower bound on the order value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_value_min: Option<ClauseValue>,
    /// Inclusive upper bound on the order value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_value_max: Option<ClauseValue>,
    /// Exact customer tier (e.g. "VIP").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_tier: Option<ClauseValue>,
    /// Inclusive lower bound on the customer lifetime value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_value_min: Option<ClauseValue>,
    /// Inclusive upper bound on the customer lifetime value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_value_max: Option<ClauseValue>,
    /// Exact day of week: 0 (Sunday) to 6 (Saturday), or a weekday name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<ClauseValue>,
    /// Inclusive start of the time-of-day window (`HH:MM` or `HH:MM:SS`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_start: Option<ClauseValue>,
    /// Inclusive end of the time-of-day window (`HH:MM` or `HH:MM:SS`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_end: Option<ClauseValue>,
    /// Inclusive lower bound on the violation score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_score_min: Option<ClauseValue>,
    /// Inclusive upper bound on the violation score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_score_max: Option<ClauseValue>,
    /// Exact charge type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_type: Option<ClauseValue>,
    /// Exact quote stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_stage: Option<ClauseValue>,
}

impl RuleConditions {
    /// Returns the present clauses as `(key, value)` pairs in evaluation order.
    pub fn clauses(&self) -> Vec<(&'static str, &ClauseValue)> {
        [
            ("orderValueMin", &self.order_value_min),
            ("orderValueMax", &self.order_value_max),
            ("customerTier", &self.customer_tier),
            ("lifetimeValueMin", &self.lifetime_value_min),
            ("lifetimeValueMax", &self.lifetime_value_max),
            ("dayOfWeek", &self.day_of_week),
            ("timeStart", &self.time_start),
            ("timeEnd", &self.time_end),
            ("violationScoreMin", &self.violation_score_min),
            ("violationScoreMax", &self.violation_score_max),
            ("chargeType", &self.charge_type),
            ("quoteStage", &self.quote_stage),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key, v)))
        .collect()
    }

    /// Returns true if the rule has no clauses and therefore matches everything.
    pub fn is_empty(&self) -> bool {
        self.clauses().is_empty()
    }
}

/// The formula family used to turn a matched rule into a numeric outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalculationType {
    /// A stored fixed amount.
    Fixed,
    /// A percentage of the order subtotal.
    PercentageOfSubtotal,
    /// A percentage of the order total.
    PercentageOfTotal,
    /// Multi-bracket pricing. Present in stored data, no evaluator.
    Tiered,
    /// Free-form expression. Present in stored data, no evaluator.
    Formula,
}

impl CalculationType {
    /// Returns the stored identifier of this calculation type.
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationType::Fixed => "fixed",
            CalculationType::PercentageOfSubtotal => "percentageOfSubtotal",
            CalculationType::PercentageOfTotal => "percentageOfTotal",
            CalculationType::Tiered => "tiered",
            CalculationType::Formula => "formula",
        }
    }
}

impl fmt::Display for CalculationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculationType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(CalculationType::Fixed),
            "percentageOfSubtotal" => Ok(CalculationType::PercentageOfSubtotal),
            "percentageOfTotal" => Ok(CalculationType::PercentageOfTotal),
            "tiered" => Ok(CalculationType::Tiered),
            "formula" => Ok(CalculationType::Formula),
            other => Err(EngineError::InvalidRule {
                field: "calculation_type".to_string(),
                message: format!("unknown calculation type '{}'", other),
            }),
        }
    }
}

/// How prices are presented to a customer by a pricing display rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    /// Prices are shown normally.
    #[default]
    Show,
    /// Prices are hidden.
    Hide,
    /// Prices are replaced by a request-a-quote prompt.
    RequestQuote,
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayState::Show => write!(f, "show"),
            DisplayState::Hide => write!(f, "hide"),
            DisplayState::RequestQuote => write!(f, "request_quote"),
        }
    }
}

/// Calculation-type-specific parameters of a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CalculationConfig {
    /// Amount returned by `fixed` rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_amount: Option<Decimal>,
    /// Percentage for percentage rules, as a plain number (15 means 15%).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Decimal>,
    /// Inclusive floor applied to the final amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cap: Option<Decimal>,
    /// Inclusive ceiling applied to the final amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cap: Option<Decimal>,
    /// Discount percentage per customer tier.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tier_discounts: BTreeMap<String, Decimal>,
    /// Display state produced by pricing display rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<DisplayState>,
    /// Tier breakpoints kept for `tiered` rules; not evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiers: Option<serde_json::Value>,
    /// Expression kept for `formula` rules; not evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

/// A persisted rule.
///
/// # Example
///
/// ```
/// use commerce_rules::models::{CalculationType, Rule};
///
/// let rule: Rule = serde_json::from_str(r#"{
///     "id": 1,
///     "name": "VIP rush",
///     "priority": 1,
///     "is_active": true,
///     "conditions": { "customerTier": "VIP" },
///     "calculation_type": "fixed",
///     "calculation_config": { "fixedAmount": "10" }
/// }"#).unwrap();
///
/// assert_eq!(rule.calculation_type, CalculationType::Fixed);
/// assert!(!rule.conditions.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier within the rule set, assigned in insertion order.
    pub id: u64,
    /// Human label, unique per rule set.
    pub name: String,
    /// Ordering key; lower values are evaluated first.
    pub priority: i32,
    /// Inactive rules are excluded from evaluation.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// The predicate clauses.
    #[serde(default)]
    pub conditions: RuleConditions,
    /// The formula family for the outcome.
    pub calculation_type: CalculationType,
    /// Parameters for the calculation.
    #[serde(default)]
    pub calculation_config: CalculationConfig,
}

fn default_active() -> bool {
    true
}

impl Rule {
    /// Builds a rule from a draft with the store-assigned ID.
    pub fn from_draft(id: u64, draft: RuleDraft) -> Self {
        Rule {
            id,
            name: draft.name,
            priority: draft.priority,
            is_active: draft.is_active,
            conditions: draft.conditions,
            calculation_type: draft.calculation_type,
            calculation_config: draft.calculation_config,
        }
    }

    /// The evaluation ordering key: `(priority, id)` ascending.
    pub fn sort_key(&self) -> (i32, u64) {
        (self.priority, self.id)
    }

    /// Applies the [`RuleDraft::validate`] checks to a stored rule.
    pub fn validate(&self, rule_type: RuleType) -> EngineResult<()> {
        check_rule(
            &self.name,
            self.calculation_type,
            &self.calculation_config,
            rule_type,
        )
    }
}

/// The admin-editable part of a rule, used to create or overwrite one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
    /// Human label, unique per rule set.
    pub name: String,
    /// Ordering key; lower values are evaluated first.
    pub priority: i32,
    /// Whether the rule takes part in evaluation.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// The predicate clauses.
    #[serde(default)]
    pub conditions: RuleConditions,
    /// The formula family for the outcome.
    pub calculation_type: CalculationType,
    /// Parameters for the calculation.
    #[serde(default)]
    pub calculation_config: CalculationConfig,
}

impl RuleDraft {
    /// Checks that the draft is internally consistent for its rule type.
    ///
    /// Financial rule types must carry the parameter their calculation type
    /// reads. Caps must not be inverted and tier discounts must lie within
    /// 0 to 100 percent. `tiered` and `formula` drafts are accepted so they
    /// can be stored; they fail at evaluation instead.
    pub fn validate(&self, rule_type: RuleType) -> EngineResult<()> {
        check_rule(
            &self.name,
            self.calculation_type,
            &self.calculation_config,
            rule_type,
        )
    }
}

fn check_rule(
    name: &str,
    calculation_type: CalculationType,
    config: &CalculationConfig,
    rule_type: RuleType,
) -> EngineResult<()> {
    if name.trim().is_empty() {
        return Err(EngineError::InvalidRule {
            field: "name".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    if rule_type.is_financial() {
        match calculation_type {
            CalculationType::Fixed if config.fixed_amount.is_none() => {
                return Err(EngineError::InvalidRule {
                    field: "calculation_config.fixedAmount".to_string(),
                    message: "required for fixed rules".to_string(),
                });
            }
            CalculationType::PercentageOfSubtotal | CalculationType::PercentageOfTotal
                if config.percentage.is_none() =>
            {
                return Err(EngineError::InvalidRule {
                    field: "calculation_config.percentage".to_string(),
                    message: "required for percentage rules".to_string(),
                });
            }
            _ => {}
        }
    }

    if let (Some(min), Some(max)) = (config.min_cap, config.max_cap) {
        if min > max {
            return Err(EngineError::InvalidRule {
                field: "calculation_config.minCap".to_string(),
                message: format!("minCap {} is greater than maxCap {}", min, max),
            });
        }
    }

    for (tier, discount) in &config.tier_discounts {
        if *discount < Decimal::ZERO || *discount > Decimal::ONE_HUNDRED {
            return Err(EngineError::InvalidRule {
                field: format!("calculation_config.tierDiscounts.{}", tier),
                message: format!("discount {} must be between 0 and 100", discount),
            });
        }
    }

    Ok(())
}

impl From<Rule> for RuleDraft {
    fn from(rule: Rule) -> Self {
        RuleDraft {
            name: rule.name,
            priority: rule.priority,
            is_active: rule.is_active,
            conditions: rule.conditions,
            calculation_type: rule.calculation_type,
            calculation_config: rule.calculation_config,
        }
    }
}
