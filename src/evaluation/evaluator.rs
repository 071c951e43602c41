//! Rule set evaluation.
//!
//! This module composes matching, resolution and outcome calculation into a
//! single evaluation call, applies the explicit system defaults when no rule
//! matches, and decides how storage failures degrade per rule type.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditTrace, DisplayState, EvaluationContext, EvaluationResult, MatchedRule, Outcome, Rule,
    RuleType,
};
use crate::store::RuleStore;

use super::{calculate_outcome, resolve, sort_rules};

/// Display state used when no pricing display rule matches.
pub const DEFAULT_DISPLAY_STATE: DisplayState = DisplayState::Show;

/// Amount used when no surcharge or collection pricing rule matches.
pub const DEFAULT_SURCHARGE: Decimal = Decimal::ZERO;

/// Returns the system default outcome for a rule type.
pub fn default_outcome(rule_type: RuleType) -> Outcome {
    if rule_type.is_financial() {
        Outcome::Amount(DEFAULT_SURCHARGE)
    } else {
        Outcome::Display(DEFAULT_DISPLAY_STATE)
    }
}

/// Evaluates a rule set against a context.
///
/// Selects the first active matching rule by `(priority ASC, id ASC)` and
/// calculates its outcome. When no rule matches, the rule type's default
/// ([`DEFAULT_DISPLAY_STATE`] or [`DEFAULT_SURCHARGE`]) is returned with
/// `used_default` set.
///
/// Evaluation is deterministic: identical inputs produce equal results.
///
/// # Errors
///
/// Propagates `UnsupportedCalculationType` and `InvalidRule` from the
/// selected rule's calculation. Errors never turn into a zero amount.
///
/// # Example
///
/// ```
/// use commerce_rules::evaluation::evaluate;
/// use commerce_rules::models::{CalculationConfig, CalculationType, EvaluationContext, Rule, RuleType};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let rules = vec![Rule {
///     id: 1,
///     name: "Flat rush fee".to_string(),
///     priority: 1,
///     is_active: true,
///     conditions: Default::default(),
///     calculation_type: CalculationType::Fixed,
///     calculation_config: CalculationConfig {
///         fixed_amount: Some(Decimal::new(10, 0)),
///         ..Default::default()
///     },
/// }];
/// let at = NaiveDate::from_ymd_opt(2026, 1, 13).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let context = EvaluationContext::new(Decimal::new(80, 0), at);
///
/// let result = evaluate(RuleType::RushSurcharge, &rules, &context).unwrap();
/// assert_eq!(result.outcome.amount(), Some(Decimal::new(10, 0)));
/// assert!(!result.used_default);
/// ```
pub fn evaluate(
    rule_type: RuleType,
    rules: &[Rule],
    context: &EvaluationContext,
) -> EngineResult<EvaluationResult> {
    let mut audit_trace = AuditTrace::default();
    let candidates: Vec<u64> = sort_rules(rules).iter().map(|r| r.id).collect();

    let Some(rule) = resolve(rules, context) else {
        let outcome = default_outcome(rule_type);
        audit_trace.push_step(
            "rule_selection",
            "Rule Selection",
            serde_json::json!({
                "rule_type": rule_type.as_str(),
                "candidates": candidates,
            }),
            serde_json::json!({ "matched_rule": null }),
            format!(
                "No active {} rule matched; applying system default",
                rule_type
            ),
        );
        return Ok(EvaluationResult {
            rule_type,
            matched_rule: None,
            outcome,
            used_default: true,
            audit_trace,
        });
    };

    audit_trace.push_step(
        "rule_selection",
        "Rule Selection",
        serde_json::json!({
            "rule_type": rule_type.as_str(),
            "candidates": candidates,
        }),
        serde_json::json!({
            "matched_rule": rule.id,
            "priority": rule.priority,
        }),
        format!(
            "Selected rule '{}' (id {}, priority {}) as first match",
            rule.name, rule.id, rule.priority
        ),
    );

    let next_step = audit_trace.steps.len() as u32 + 1;
    let outcome_result = calculate_outcome(rule_type, rule, context, next_step)?;
    audit_trace.steps.extend(outcome_result.audit_steps);

    Ok(EvaluationResult {
        rule_type,
        matched_rule: Some(MatchedRule::from(rule)),
        outcome: outcome_result.outcome,
        used_default: false,
        audit_trace,
    })
}

/// Loads a rule set from a store and evaluates it.
///
/// When the store reports `StorageUnavailable`, display rule types fall back
/// to the system default with a `STORAGE_FALLBACK` warning in the audit
/// trace; financial rule types propagate the error so a surcharge never
/// silently computes as zero.
pub fn evaluate_with_store<S>(
    store: &S,
    rule_type: RuleType,
    context: &EvaluationContext,
) -> EngineResult<EvaluationResult>
where
    S: RuleStore + ?Sized,
{
    match store.load_rules(rule_type) {
        Ok(rules) => evaluate(rule_type, &rules, context),
        Err(err) => degrade_or_fail(rule_type, err),
    }
}

fn degrade_or_fail(rule_type: RuleType, err: EngineError) -> EngineResult<EvaluationResult> {
    match err {
        EngineError::StorageUnavailable { ref message, .. } if !rule_type.is_financial() => {
            warn!(
                rule_type = %rule_type,
                error = %message,
                "Rule storage unavailable; falling back to default display"
            );
            let mut audit_trace = AuditTrace::default();
            audit_trace.warn(
                "STORAGE_FALLBACK",
                format!("Rules could not be loaded: {}", message),
                "medium",
            );
            Ok(EvaluationResult {
                rule_type,
                matched_rule: None,
                outcome: default_outcome(rule_type),
                used_default: true,
                audit_trace,
            })
        }
        other => Err(other),
    }
}

/// Evaluates many contexts against one store, loading each rule type once.
///
/// Loaded rule sets are cached only for the lifetime of the batch; dropping
/// the batch discards them, so the next batch sees the latest configuration.
///
/// # Example
///
/// ```
/// use commerce_rules::evaluation::RuleBatch;
/// use commerce_rules::models::{EvaluationContext, RuleType};
/// use commerce_rules::store::InMemoryRuleStore;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let store = InMemoryRuleStore::new();
/// let mut batch = RuleBatch::new(&store);
/// let at = NaiveDate::from_ymd_opt(2026, 1, 13).unwrap().and_hms_opt(9, 0, 0).unwrap();
///
/// let result = batch
///     .evaluate(RuleType::RushSurcharge, &EvaluationContext::new(Decimal::ONE, at))
///     .unwrap();
/// assert!(result.used_default);
/// ```
pub struct RuleBatch<'a, S: RuleStore + ?Sized> {
    store: &'a S,
    cache: HashMap<RuleType, Arc<Vec<Rule>>>,
}

impl<'a, S: RuleStore + ?Sized> RuleBatch<'a, S> {
    /// Starts a new batch over a store.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            cache: HashMap::new(),
        }
    }

    /// Evaluates one context, loading the rule type on first use.
    ///
    /// Storage failures follow the same policy as [`evaluate_with_store`];
    /// a failed load is not cached, so a later item retries it.
    pub fn evaluate(
        &mut self,
        rule_type: RuleType,
        context: &EvaluationContext,
    ) -> EngineResult<EvaluationResult> {
        let rules = match self.rules(rule_type) {
            Ok(rules) => rules,
            Err(err) => return degrade_or_fail(rule_type, err),
        };
        evaluate(rule_type, &rules, context)
    }

    /// Returns the number of rule types loaded so far in this batch.
    pub fn loaded_rule_types(&self) -> usize {
        self.cache.len()
    }

    fn rules(&mut self, rule_type: RuleType) -> EngineResult<Arc<Vec<Rule>>> {
        if let Some(rules) = self.cache.get(&rule_type) {
            return Ok(Arc::clone(rules));
        }
        let rules = Arc::new(self.store.load_rules(rule_type)?);
        debug!(rule_type = %rule_type, count = rules.len(), "Loaded rules for batch");
        self.cache.insert(rule_type, Arc::clone(&rules));
        Ok(rules)
    }
}
