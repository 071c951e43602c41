//! Rule type (namespace) definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The rule family a rule set belongs to.
///
/// Each rule type is stored and evaluated as its own namespace. Display
/// rule types degrade to the system default when storage is unavailable;
/// financial rule types fail hard.
///
/// # Example
///
/// ```
/// use commerce_rules::models::RuleType;
/// use std::str::FromStr;
///
/// let rule_type = RuleType::from_str("rush_surcharge").unwrap();
/// assert!(rule_type.is_financial());
/// assert_eq!(rule_type.to_string(), "rush_surcharge");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Whether and how prices are shown to a customer.
    PricingDisplay,
    /// Surcharges for rush orders.
    RushSurcharge,
    /// Pricing for off-hours collections.
    CollectionPricing,
}

impl RuleType {
    /// All known rule types.
    pub const ALL: [RuleType; 3] = [
        RuleType::PricingDisplay,
        RuleType::RushSurcharge,
        RuleType::CollectionPricing,
    ];

    /// Returns the stored identifier of this rule type.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::PricingDisplay => "pricing_display",
            RuleType::RushSurcharge => "rush_surcharge",
            RuleType::CollectionPricing => "collection_pricing",
        }
    }

    /// Returns true if this rule type computes money.
    ///
    /// A financial outcome must never silently fall back to zero.
    pub fn is_financial(&self) -> bool {
        !matches!(self, RuleType::PricingDisplay)
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleType::ALL
            .into_iter()
            .find(|rt| rt.as_str() == s)
            .ok_or_else(|| EngineError::UnknownRuleType {
                value: s.to_string(),
            })
    }
}
