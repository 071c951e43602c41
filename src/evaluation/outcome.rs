//! Outcome calculation.
//!
//! This module turns a selected rule into its final value: the base amount
//! for the rule's calculation type, then the customer-tier discount, then
//! the min/max caps. Display rule types produce a display state instead.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, CalculationConfig, CalculationType, EvaluationContext, Outcome, Rule, RuleType,
};

use super::DEFAULT_DISPLAY_STATE;

/// The result of calculating a rule's outcome, including audit steps.
#[derive(Debug, Clone)]
pub struct OutcomeResult {
    /// The final outcome.
    pub outcome: Outcome,
    /// The audit steps recording the calculation.
    pub audit_steps: Vec<AuditStep>,
}

/// Calculates the outcome of a selected rule for a context.
///
/// For financial rule types:
/// 1. the base amount is computed from the calculation type,
/// 2. a configured discount for the context's customer tier is applied once
///    as `amount * (1 - discount / 100)`,
/// 3. the result is clamped to `[minCap, maxCap]` where present.
///
/// For display rule types the configured display state is returned.
///
/// # Errors
///
/// - `UnsupportedCalculationType` for `tiered` and `formula` rules
/// - `InvalidRule` when the parameter the calculation needs is missing or
///   the caps are inverted
/// - `CalculationOverflow` when an intermediate amount leaves the `Decimal`
///   range
///
/// # Example
///
/// ```
/// use commerce_rules::evaluation::calculate_outcome;
/// use commerce_rules::models::{CalculationConfig, CalculationType, EvaluationContext, Rule, RuleType};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let rule = Rule {
///     id: 1,
///     name: "Rush 15%".to_string(),
///     priority: 1,
///     is_active: true,
///     conditions: Default::default(),
///     calculation_type: CalculationType::PercentageOfSubtotal,
///     calculation_config: CalculationConfig {
///         percentage: Some(Decimal::new(15, 0)),
///         min_cap: Some(Decimal::new(5, 0)),
///         ..Default::default()
///     },
/// };
/// let at = NaiveDate::from_ymd_opt(2026, 1, 13).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let context = EvaluationContext::new(Decimal::new(10, 0), at);
///
/// let result = calculate_outcome(RuleType::RushSurcharge, &rule, &context, 1).unwrap();
/// // 15% of 10 is 1.5, raised to the 5 minimum
/// assert_eq!(result.outcome.amount(), Some(Decimal::new(5, 0)));
/// ```
pub fn calculate_outcome(
    rule_type: RuleType,
    rule: &Rule,
    context: &EvaluationContext,
    step_number: u32,
) -> EngineResult<OutcomeResult> {
    let config = &rule.calculation_config;

    if !rule_type.is_financial() {
        let state = config.display.unwrap_or(DEFAULT_DISPLAY_STATE);
        let audit_step = AuditStep {
            step_number,
            step_id: "display_state".to_string(),
            step_name: "Display State".to_string(),
            input: serde_json::json!({
                "rule_id": rule.id,
                "configured_display": config.display.map(|d| d.to_string()),
            }),
            output: serde_json::json!({ "display": state.to_string() }),
            reasoning: format!("Rule '{}' sets price display to '{}'", rule.name, state),
        };
        return Ok(OutcomeResult {
            outcome: Outcome::Display(state),
            audit_steps: vec![audit_step],
        });
    }

    let mut audit_steps = Vec::with_capacity(3);
    let mut step_number = step_number;

    let base = base_amount(rule, context)?;
    audit_steps.push(AuditStep {
        step_number,
        step_id: "base_calculation".to_string(),
        step_name: "Base Calculation".to_string(),
        input: serde_json::json!({
            "calculation_type": rule.calculation_type.as_str(),
            "amount": context.amount.normalize().to_string(),
            "total": context.total.map(|t| t.normalize().to_string()),
            "fixed_amount": config.fixed_amount.map(|a| a.normalize().to_string()),
            "percentage": config.percentage.map(|p| p.normalize().to_string()),
        }),
        output: serde_json::json!({ "base": base.normalize().to_string() }),
        reasoning: format!(
            "Calculated {} for rule '{}': {}",
            rule.calculation_type,
            rule.name,
            base.normalize()
        ),
    });
    step_number += 1;

    let tier = context.customer_tier.as_deref();
    let (discounted, discount) = apply_tier_discount(base, config, tier)?;
    if let Some(discount) = discount {
        audit_steps.push(AuditStep {
            step_number,
            step_id: "tier_discount".to_string(),
            step_name: "Customer Tier Discount".to_string(),
            input: serde_json::json!({
                "amount": base.normalize().to_string(),
                "customer_tier": tier,
                "discount_percent": discount.normalize().to_string(),
            }),
            output: serde_json::json!({ "amount": discounted.normalize().to_string() }),
            reasoning: format!(
                "Applied {}% discount for tier '{}': {} -> {}",
                discount.normalize(),
                tier.unwrap_or_default(),
                base.normalize(),
                discounted.normalize()
            ),
        });
        step_number += 1;
    }

    let capped = apply_caps(discounted, config.min_cap, config.max_cap)?;
    if config.min_cap.is_some() || config.max_cap.is_some() {
        audit_steps.push(AuditStep {
            step_number,
            step_id: "cap_clamp".to_string(),
            step_name: "Cap Clamp".to_string(),
            input: serde_json::json!({
                "amount": discounted.normalize().to_string(),
                "min_cap": config.min_cap.map(|c| c.normalize().to_string()),
                "max_cap": config.max_cap.map(|c| c.normalize().to_string()),
            }),
            output: serde_json::json!({
                "amount": capped.normalize().to_string(),
                "clamped": capped != discounted,
            }),
            reasoning: if capped != discounted {
                format!(
                    "Clamped {} to {}",
                    discounted.normalize(),
                    capped.normalize()
                )
            } else {
                format!("{} is within caps", discounted.normalize())
            },
        });
    }

    Ok(OutcomeResult {
        outcome: Outcome::Amount(capped),
        audit_steps,
    })
}

/// Computes the base amount for a rule's calculation type.
///
/// - `fixed`: the stored fixed amount, verbatim.
/// - `percentageOfSubtotal`: `amount * percentage / 100`.
/// - `percentageOfTotal`: `total * percentage / 100`, using the amount when
///   no total was supplied.
pub fn base_amount(rule: &Rule, context: &EvaluationContext) -> EngineResult<Decimal> {
    let config = &rule.calculation_config;
    match rule.calculation_type {
        CalculationType::Fixed => config.fixed_amount.ok_or_else(|| EngineError::InvalidRule {
            field: "calculation_config.fixedAmount".to_string(),
            message: format!("rule {} has no fixed amount", rule.id),
        }),
        CalculationType::PercentageOfSubtotal => {
            percentage_of(context.amount, required_percentage(rule)?)
        }
        CalculationType::PercentageOfTotal => {
            percentage_of(context.total_or_amount(), required_percentage(rule)?)
        }
        CalculationType::Tiered | CalculationType::Formula => {
            Err(EngineError::UnsupportedCalculationType {
                rule_id: rule.id,
                calculation_type: rule.calculation_type.to_string(),
            })
        }
    }
}

fn required_percentage(rule: &Rule) -> EngineResult<Decimal> {
    rule.calculation_config
        .percentage
        .ok_or_else(|| EngineError::InvalidRule {
            field: "calculation_config.percentage".to_string(),
            message: format!("rule {} has no percentage", rule.id),
        })
}

/// Returns `percentage` percent of `base`. A percentage of 100 returns
/// `base` exactly.
///
/// # Errors
///
/// Returns `CalculationOverflow` if the product leaves the `Decimal` range.
pub fn percentage_of(base: Decimal, percentage: Decimal) -> EngineResult<Decimal> {
    if percentage == Decimal::ONE_HUNDRED {
        return Ok(base);
    }
    base.checked_mul(percentage)
        .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow(format!("{}% of {}", percentage, base)))
}

/// Applies the discount configured for `tier`, if any.
///
/// Returns the discounted amount and the discount percent that was applied.
///
/// # Errors
///
/// Returns `CalculationOverflow` if the discounted amount leaves the
/// `Decimal` range.
pub fn apply_tier_discount(
    amount: Decimal,
    config: &CalculationConfig,
    tier: Option<&str>,
) -> EngineResult<(Decimal, Option<Decimal>)> {
    match tier.and_then(|t| config.tier_discounts.get(t)) {
        Some(discount) => {
            let discounted = discount
                .checked_div(Decimal::ONE_HUNDRED)
                .and_then(|fraction| Decimal::ONE.checked_sub(fraction))
                .and_then(|factor| amount.checked_mul(factor))
                .ok_or_else(|| overflow(format!("{}% discount on {}", discount, amount)))?;
            Ok((discounted, Some(*discount)))
        }
        None => Ok((amount, None)),
    }
}

fn overflow(operation: String) -> EngineError {
    EngineError::CalculationOverflow { operation }
}

/// Clamps `amount` to the inclusive `[min_cap, max_cap]` range.
///
/// A missing bound is unbounded on that side.
///
/// # Errors
///
/// Returns `InvalidRule` if `min_cap` is greater than `max_cap`.
pub fn apply_caps(
    amount: Decimal,
    min_cap: Option<Decimal>,
    max_cap: Option<Decimal>,
) -> EngineResult<Decimal> {
    if let (Some(min), Some(max)) = (min_cap, max_cap) {
        if min > max {
            return Err(EngineError::InvalidRule {
                field: "calculation_config.minCap".to_string(),
                message: format!("minCap {} is greater than maxCap {}", min, max),
            });
        }
    }

    let mut result = amount;
    if let Some(min) = min_cap {
        result = result.max(min);
    }
    if let Some(max) = max_cap {
        result = result.min(max);
    }
    Ok(result)
}
