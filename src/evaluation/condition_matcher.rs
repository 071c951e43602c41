//! Condition matching.
//!
//! This module decides whether an [`EvaluationContext`] satisfies the
//! stored clauses of a rule. Matching is pure: no I/O and no shared state,
//! so it is safe to call concurrently and repeatedly.

use std::str::FromStr;

use chrono::{Datelike, NaiveTime, Weekday};
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::models::{ClauseValue, EvaluationContext, RuleConditions};

/// Returns true if the context satisfies every present clause.
///
/// - Numeric ranges (`orderValue*`, `lifetimeValue*`, `violationScore*`) are
///   inclusive on both bounds.
/// - `customerTier`, `chargeType` and `quoteStage` are exact string matches;
///   `dayOfWeek` is an exact weekday match.
/// - `timeStart`/`timeEnd` form an inclusive window inside one day. A window
///   whose start is after its end never matches; overnight windows are not
///   supported.
/// - Absent clauses always match, so a rule with no clauses matches every
///   context.
/// - A clause whose stored value cannot be parsed does not match, and a
///   warning is logged.
///
/// # Example
///
/// ```
/// use commerce_rules::evaluation::matches;
/// use commerce_rules::models::{EvaluationContext, RuleConditions};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let at = NaiveDate::from_ymd_opt(2026, 1, 13).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let context = EvaluationContext::new(Decimal::new(50, 0), at).with_customer_tier("VIP");
///
/// let vip_only = RuleConditions { customer_tier: Some("VIP".into()), ..Default::default() };
/// assert!(matches(&vip_only, &context));
/// assert!(matches(&RuleConditions::default(), &context));
/// ```
pub fn matches(conditions: &RuleConditions, context: &EvaluationContext) -> bool {
    conditions
        .clauses()
        .into_iter()
        .all(|(clause, value)| match check_clause(clause, value, context) {
            Ok(satisfied) => satisfied,
            Err(err) => {
                warn!(clause, value = %value, error = %err, "Condition clause treated as non-matching");
                false
            }
        })
}

/// Checks one clause against the context.
///
/// Returns `MalformedConditionClause` when the stored value does not parse
/// as the type the clause expects.
pub fn check_clause(
    clause: &str,
    value: &ClauseValue,
    context: &EvaluationContext,
) -> EngineResult<bool> {
    match clause {
        "orderValueMin" => Ok(parse_decimal(clause, value)? <= context.amount),
        "orderValueMax" => Ok(context.amount <= parse_decimal(clause, value)?),
        "lifetimeValueMin" => {
            let bound = parse_decimal(clause, value)?;
            Ok(context.lifetime_value.is_some_and(|v| bound <= v))
        }
        "lifetimeValueMax" => {
            let bound = parse_decimal(clause, value)?;
            Ok(context.lifetime_value.is_some_and(|v| v <= bound))
        }
        "violationScoreMin" => {
            let bound = parse_decimal(clause, value)?;
            Ok(context.violation_score.is_some_and(|v| bound <= v))
        }
        "violationScoreMax" => {
            let bound = parse_decimal(clause, value)?;
            Ok(context.violation_score.is_some_and(|v| v <= bound))
        }
        "customerTier" => exact_text(clause, value, context.customer_tier.as_deref()),
        "chargeType" => exact_text(clause, value, context.charge_type.as_deref()),
        "quoteStage" => exact_text(clause, value, context.quote_stage.as_deref()),
        "dayOfWeek" => Ok(parse_weekday(clause, value)? == context.at.weekday()),
        "timeStart" => Ok(parse_time(clause, value)? <= context.at.time()),
        "timeEnd" => Ok(context.at.time() <= parse_time(clause, value)?),
        other => Err(malformed(other, value, "unknown clause")),
    }
}

fn malformed(clause: &str, value: &ClauseValue, message: &str) -> EngineError {
    EngineError::MalformedConditionClause {
        clause: clause.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

fn parse_decimal(clause: &str, value: &ClauseValue) -> EngineResult<Decimal> {
    value
        .as_decimal()
        .ok_or_else(|| malformed(clause, value, "expected a number"))
}

fn exact_text(clause: &str, value: &ClauseValue, actual: Option<&str>) -> EngineResult<bool> {
    let expected = value
        .as_text()
        .ok_or_else(|| malformed(clause, value, "expected text"))?;
    Ok(actual == Some(expected.as_str()))
}

/// Parses a weekday from `0` (Sunday) to `6` (Saturday) or an English name.
fn parse_weekday(clause: &str, value: &ClauseValue) -> EngineResult<Weekday> {
    let text = value
        .as_text()
        .ok_or_else(|| malformed(clause, value, "expected a weekday"))?;
    let text = text.trim();

    if let Ok(index) = text.parse::<u8>() {
        return match index {
            0 => Ok(Weekday::Sun),
            1 => Ok(Weekday::Mon),
            2 => Ok(Weekday::Tue),
            3 => Ok(Weekday::Wed),
            4 => Ok(Weekday::Thu),
            5 => Ok(Weekday::Fri),
            6 => Ok(Weekday::Sat),
            _ => Err(malformed(clause, value, "weekday index must be 0 to 6")),
        };
    }

    Weekday::from_str(text).map_err(|_| malformed(clause, value, "expected a weekday"))
}

fn parse_time(clause: &str, value: &ClauseValue) -> EngineResult<NaiveTime> {
    let text = value
        .as_text()
        .ok_or_else(|| malformed(clause, value, "expected a time of day"))?;
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|_| malformed(clause, value, "expected HH:MM or HH:MM:SS"))
}
