//! Rule storage for the commerce rule engine.
//!
//! All rule persistence sits behind the [`RuleStore`] trait so evaluation
//! can be tested without a live backend. Three backends are provided:
//!
//! - [`InMemoryRuleStore`] for tests and embedded use
//! - [`YamlRuleStore`], one YAML file per rule type in a directory
//! - [`SqliteRuleStore`], a relational `rules` table with JSON condition and
//!   configuration columns
//!
//! No backend caches across calls: every `load_rules` reflects the latest
//! writes, so priority and activity changes take effect on the next call.

mod memory;
mod sqlite;
mod yaml;

pub use memory::InMemoryRuleStore;
pub use sqlite::SqliteRuleStore;
pub use yaml::YamlRuleStore;

use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::models::{Rule, RuleDraft, RuleType};

/// A persistent collection of rules, namespaced by rule type.
///
/// Writes mirror the admin surface: rules are created and overwritten, and
/// removed only by deactivation. There is no delete.
pub trait RuleStore: Send + Sync {
    /// Loads the active rules of a rule type, sorted `(priority ASC, id ASC)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the backend cannot be read.
    fn load_rules(&self, rule_type: RuleType) -> EngineResult<Vec<Rule>>;

    /// Lists every rule of a rule type, including inactive ones, sorted
    /// `(priority ASC, id ASC)`.
    fn list_rules(&self, rule_type: RuleType) -> EngineResult<Vec<Rule>>;

    /// Gets one rule by ID, active or not.
    fn get_rule(&self, rule_type: RuleType, id: u64) -> EngineResult<Rule> {
        self.list_rules(rule_type)?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| EngineError::RuleNotFound {
                rule_type: rule_type.to_string(),
                id,
            })
    }

    /// Creates a rule from a validated draft and assigns its ID.
    fn create_rule(&self, rule_type: RuleType, draft: RuleDraft) -> EngineResult<Rule>;

    /// Overwrites an existing rule with a draft. The ID is kept.
    fn update_rule(
        &self,
        rule_type: RuleType,
        id: u64,
        draft: RuleDraft,
    ) -> EngineResult<Rule>;

    /// Activates or deactivates a rule.
    fn set_active(&self, rule_type: RuleType, id: u64, active: bool) -> EngineResult<Rule>;
}

/// Keeps active rules and sorts them `(priority ASC, id ASC)`.
pub(crate) fn active_sorted(rules: Vec<Rule>) -> Vec<Rule> {
    let mut active: Vec<Rule> = rules.into_iter().filter(|r| r.is_active).collect();
    active.sort_by_key(|r| r.sort_key());
    active
}

/// Fails with `DuplicateRuleName` if another rule already uses `name`.
pub(crate) fn ensure_unique_name(
    rules: &[Rule],
    rule_type: RuleType,
    name: &str,
    except_id: Option<u64>,
) -> EngineResult<()> {
    let taken = rules
        .iter()
        .any(|r| r.name == name && Some(r.id) != except_id);
    if taken {
        return Err(EngineError::DuplicateRuleName {
            rule_type: rule_type.to_string(),
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Rejects a loaded rule set if any rule fails validation.
///
/// Stored rules can be edited outside the admin surface, so a bad rule is
/// treated as unreadable storage rather than evaluated.
pub(crate) fn ensure_valid(rule_type: RuleType, rules: &[Rule]) -> EngineResult<()> {
    for rule in rules {
        if let Err(e) = rule.validate(rule_type) {
            warn!(
                rule_type = %rule_type,
                rule_id = rule.id,
                error = %e,
                "Stored rule failed validation"
            );
            return Err(unavailable(rule_type, format!("rule {}: {}", rule.id, e)));
        }
    }
    Ok(())
}

pub(crate) fn unavailable(rule_type: RuleType, message: impl ToString) -> EngineError {
    EngineError::StorageUnavailable {
        rule_type: rule_type.to_string(),
        message: message.to_string(),
    }
}
