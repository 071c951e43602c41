//! Rule resolution.
//!
//! This module selects the single authoritative rule for a context: the
//! first active rule, in `(priority ASC, id ASC)` order, whose conditions
//! match.

use tracing::debug;

use crate::models::{EvaluationContext, Rule};

use super::matches;

/// Returns references to the active rules in evaluation order.
///
/// Ordering is `(priority ASC, id ASC)`. The input order is never trusted,
/// so callers may pass rules in any order.
pub fn sort_rules(rules: &[Rule]) -> Vec<&Rule> {
    let mut ordered: Vec<&Rule> = rules.iter().filter(|r| r.is_active).collect();
    ordered.sort_by_key(|r| r.sort_key());
    ordered
}

/// Selects the applicable rule for a context.
///
/// Iterates active rules in `(priority ASC, id ASC)` order and returns the
/// first whose conditions match, or `None` if no rule matches. The same
/// `(rules, context)` input always yields the same rule.
///
/// # Example
///
/// ```
/// use commerce_rules::evaluation::resolve;
/// use commerce_rules::models::{CalculationType, EvaluationContext, Rule};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let rule = |id, priority| Rule {
///     id,
///     name: format!("rule {}", id),
///     priority,
///     is_active: true,
///     conditions: Default::default(),
///     calculation_type: CalculationType::Fixed,
///     calculation_config: Default::default(),
/// };
/// let rules = vec![rule(1, 5), rule(2, 3)];
/// let at = NaiveDate::from_ymd_opt(2026, 1, 13).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let context = EvaluationContext::new(Decimal::ONE, at);
///
/// assert_eq!(resolve(&rules, &context).map(|r| r.id), Some(2));
/// ```
pub fn resolve<'a>(rules: &'a [Rule], context: &EvaluationContext) -> Option<&'a Rule> {
    let selected = sort_rules(rules)
        .into_iter()
        .find(|rule| matches(&rule.conditions, context));

    match selected {
        Some(rule) => debug!(
            rule_id = rule.id,
            priority = rule.priority,
            "Resolved rule for context"
        ),
        None => debug!(candidates = rules.len(), "No rule matched context"),
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalculationType, ClauseValue, RuleConditions};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn rule(id: u64, priority: i32, conditions: RuleConditions) -> Rule {
        Rule {
            id,
            name: format!("rule_{}", id),
            priority,
            is_active: true,
            conditions,
            calculation_type: CalculationType::Fixed,
            calculation_config: Default::default(),
        }
    }

    fn context() -> EvaluationContext {
        let at = NaiveDate::from_ymd_opt(2026, 1, 13)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        EvaluationContext::new(Decimal::new(100, 0), at)
    }

    fn vip() -> RuleConditions {
        RuleConditions {
            customer_tier: Some("VIP".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_lowest_priority_value_wins_regardless_of_input_order() {
        let rules = vec![
            rule(1, 5, RuleConditions::default()),
            rule(2, 3, RuleConditions::default()),
        ];
        assert_eq!(resolve(&rules, &context()).unwrap().id, 2);

        let reversed: Vec<Rule> = rules.into_iter().rev().collect();
        assert_eq!(resolve(&reversed, &context()).unwrap().id, 2);
    }

    #[test]
    fn test_equal_priority_breaks_tie_by_smallest_id() {
        let rules = vec![
            rule(9, 1, RuleConditions::default()),
            rule(4, 1, RuleConditions::default()),
            rule(6, 1, RuleConditions::default()),
        ];
        assert_eq!(resolve(&rules, &context()).unwrap().id, 4);
    }

    #[test]
    fn test_inactive_rules_are_skipped() {
        let mut inactive = rule(1, 1, RuleConditions::default());
        inactive.is_active = false;
        let rules = vec![inactive, rule(2, 2, RuleConditions::default())];
        assert_eq!(resolve(&rules, &context()).unwrap().id, 2);
    }

    #[test]
    fn test_non_matching_rules_fall_through() {
        let rules = vec![rule(1, 1, vip()), rule(2, 2, RuleConditions::default())];
        assert_eq!(resolve(&rules, &context()).unwrap().id, 2);
        assert_eq!(
            resolve(&rules, &context().with_customer_tier("VIP"))
                .unwrap()
                .id,
            1
        );
    }

    #[test]
    fn test_no_match_returns_none() {
        let rules = vec![rule(1, 1, vip())];
        assert!(resolve(&rules, &context()).is_none());
        assert!(resolve(&[], &context()).is_none());
    }

    #[test]
    fn test_negative_priorities_sort_first() {
        let rules = vec![
            rule(1, 0, RuleConditions::default()),
            rule(2, -10, RuleConditions::default()),
        ];
        assert_eq!(resolve(&rules, &context()).unwrap().id, 2);
    }

    #[test]
    fn test_sort_rules_orders_and_filters() {
        let mut inactive = rule(3, 0, RuleConditions::default());
        inactive.is_active = false;
        let rules = vec![
            rule(5, 2, RuleConditions::default()),
            inactive,
            rule(1, 2, vip()),
            rule(7, 1, RuleConditions {
                order_value_min: Some(ClauseValue::from(1)),
                ..Default::default()
            }),
        ];
        let ids: Vec<u64> = sort_rules(&rules).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![7, 1, 5]);
    }
}
