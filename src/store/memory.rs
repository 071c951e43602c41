//! In-memory rule store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::models::{Rule, RuleDraft, RuleType};

use super::{RuleStore, active_sorted, ensure_unique_name, unavailable};

/// A rule store held entirely in memory.
///
/// Used as the test double for evaluation and for embedding the engine
/// without a backend. IDs are assigned from one counter shared across rule
/// types, so they are also insertion order.
///
/// # Example
///
/// ```
/// use commerce_rules::models::{CalculationConfig, CalculationType, RuleDraft, RuleType};
/// use commerce_rules::store::{InMemoryRuleStore, RuleStore};
/// use rust_decimal::Decimal;
///
/// let store = InMemoryRuleStore::new();
/// let rule = store.create_rule(RuleType::RushSurcharge, RuleDraft {
///     name: "Flat rush fee".to_string(),
///     priority: 1,
///     is_active: true,
///     conditions: Default::default(),
///     calculation_type: CalculationType::Fixed,
///     calculation_config: CalculationConfig {
///         fixed_amount: Some(Decimal::new(10, 0)),
///         ..Default::default()
///     },
/// }).unwrap();
///
/// assert_eq!(rule.id, 1);
/// assert_eq!(store.load_rules(RuleType::RushSurcharge).unwrap().len(), 1);
/// ```
#[derive(Debug)]
pub struct InMemoryRuleStore {
    rules: RwLock<HashMap<RuleType, Vec<Rule>>>,
    next_id: AtomicU64,
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRuleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates a store seeded with existing rules for one rule type.
    ///
    /// Seeded rules keep their IDs; new IDs continue after the largest one.
    pub fn with_rules(rule_type: RuleType, rules: Vec<Rule>) -> Self {
        let next_id = rules.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let mut map = HashMap::new();
        map.insert(rule_type, rules);
        Self {
            rules: RwLock::new(map),
            next_id: AtomicU64::new(next_id),
        }
    }

    fn read(
        &self,
        rule_type: RuleType,
    ) -> EngineResult<RwLockReadGuard<'_, HashMap<RuleType, Vec<Rule>>>> {
        self.rules
            .read()
            .map_err(|e| unavailable(rule_type, format!("lock poisoned: {}", e)))
    }

    fn write(
        &self,
        rule_type: RuleType,
    ) -> EngineResult<RwLockWriteGuard<'_, HashMap<RuleType, Vec<Rule>>>> {
        self.rules
            .write()
            .map_err(|e| unavailable(rule_type, format!("lock poisoned: {}", e)))
    }

    fn modify<F>(&self, rule_type: RuleType, id: u64, apply: F) -> EngineResult<Rule>
    where
        F: FnOnce(&[Rule], &mut Rule) -> EngineResult<()>,
    {
        let mut guard = self.write(rule_type)?;
        let rules = guard.entry(rule_type).or_default();
        let index = rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| EngineError::RuleNotFound {
                rule_type: rule_type.to_string(),
                id,
            })?;

        let mut updated = rules[index].clone();
        apply(rules, &mut updated)?;
        rules[index] = updated.clone();
        Ok(updated)
    }
}

impl RuleStore for InMemoryRuleStore {
    fn load_rules(&self, rule_type: RuleType) -> EngineResult<Vec<Rule>> {
        let guard = self.read(rule_type)?;
        Ok(active_sorted(guard.get(&rule_type).cloned().unwrap_or_default()))
    }

    fn list_rules(&self, rule_type: RuleType) -> EngineResult<Vec<Rule>> {
        let guard = self.read(rule_type)?;
        let mut rules = guard.get(&rule_type).cloned().unwrap_or_default();
        rules.sort_by_key(|r| r.sort_key());
        Ok(rules)
    }

    fn create_rule(&self, rule_type: RuleType, draft: RuleDraft) -> EngineResult<Rule> {
        draft.validate(rule_type)?;
        let mut guard = self.write(rule_type)?;
        let rules = guard.entry(rule_type).or_default();
        ensure_unique_name(rules, rule_type, &draft.name, None)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let rule = Rule::from_draft(id, draft);
        rules.push(rule.clone());
        info!(rule_type = %rule_type, rule_id = id, name = %rule.name, "Created rule");
        Ok(rule)
    }

    fn update_rule(&self, rule_type: RuleType, id: u64, draft: RuleDraft) -> EngineResult<Rule> {
        draft.validate(rule_type)?;
        let rule = self.modify(rule_type, id, |rules, rule| {
            ensure_unique_name(rules, rule_type, &draft.name, Some(id))?;
            *rule = Rule::from_draft(id, draft);
            Ok(())
        })?;
        info!(rule_type = %rule_type, rule_id = id, "Updated rule");
        Ok(rule)
    }

    fn set_active(&self, rule_type: RuleType, id: u64, active: bool) -> EngineResult<Rule> {
        let rule = self.modify(rule_type, id, |_, rule| {
            rule.is_active = active;
            Ok(())
        })?;
        info!(rule_type = %rule_type, rule_id = id, active, "Changed rule activity");
        Ok(rule)
    }
}
