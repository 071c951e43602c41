//! YAML file rule store.
//!
//! Each rule type lives in its own file inside a rules directory:
//!
//! ```text
//! config/rules/
//! ├── pricing_display.yaml
//! ├── rush_surcharge.yaml
//! └── collection_pricing.yaml
//! ```
//!
//! Files are re-read on every call so an administrator's edit is picked up
//! by the next evaluation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::models::{Rule, RuleDraft, RuleType};

use super::{RuleStore, active_sorted, ensure_unique_name, ensure_valid, unavailable};

/// The on-disk shape of one rule type's file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RuleSetFile {
    #[serde(default)]
    rules: Vec<Rule>,
}

/// A rule store backed by one YAML file per rule type.
///
/// A missing file means the rule type has no rules; a missing directory
/// means storage is unavailable. IDs are unique within one file. Writes
/// rewrite the whole file and are serialized by a lock.
///
/// # Example
///
/// ```no_run
/// use commerce_rules::models::RuleType;
/// use commerce_rules::store::{RuleStore, YamlRuleStore};
///
/// let store = YamlRuleStore::new("./config/rules");
/// let rules = store.load_rules(RuleType::PricingDisplay)?;
/// println!("{} active pricing display rules", rules.len());
/// # Ok::<(), commerce_rules::error::EngineError>(())
/// ```
#[derive(Debug)]
pub struct YamlRuleStore {
    rules_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl YamlRuleStore {
    /// Creates a store over a rules directory.
    pub fn new<P: AsRef<Path>>(rules_dir: P) -> Self {
        Self {
            rules_dir: rules_dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the file path holding a rule type's rules.
    pub fn file_path(&self, rule_type: RuleType) -> PathBuf {
        self.rules_dir.join(format!("{}.yaml", rule_type.as_str()))
    }

    fn read_file(&self, rule_type: RuleType) -> EngineResult<RuleSetFile> {
        if !self.rules_dir.is_dir() {
            return Err(unavailable(
                rule_type,
                format!("rules directory not found: {}", self.rules_dir.display()),
            ));
        }

        let path = self.file_path(rule_type);
        if !path.exists() {
            return Ok(RuleSetFile::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| unavailable(rule_type, format!("{}: {}", path.display(), e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| unavailable(rule_type, format!("{}: {}", path.display(), e)))
    }

    fn write_file(&self, rule_type: RuleType, file: &RuleSetFile) -> EngineResult<()> {
        let path = self.file_path(rule_type);
        let content = serde_yaml::to_string(file)
            .map_err(|e| unavailable(rule_type, format!("{}: {}", path.display(), e)))?;
        fs::write(&path, content)
            .map_err(|e| unavailable(rule_type, format!("{}: {}", path.display(), e)))
    }

    fn modify<F>(&self, rule_type: RuleType, id: u64, apply: F) -> EngineResult<Rule>
    where
        F: FnOnce(&[Rule], &mut Rule) -> EngineResult<()>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| unavailable(rule_type, format!("lock poisoned: {}", e)))?;

        let mut file = self.read_file(rule_type)?;
        let index = file
            .rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| EngineError::RuleNotFound {
                rule_type: rule_type.to_string(),
                id,
            })?;

        let mut updated = file.rules[index].clone();
        apply(&file.rules, &mut updated)?;
        file.rules[index] = updated.clone();
        self.write_file(rule_type, &file)?;
        Ok(updated)
    }
}

impl RuleStore for YamlRuleStore {
    fn load_rules(&self, rule_type: RuleType) -> EngineResult<Vec<Rule>> {
        let rules = active_sorted(self.read_file(rule_type)?.rules);
        ensure_valid(rule_type, &rules)?;
        Ok(rules)
    }

    fn list_rules(&self, rule_type: RuleType) -> EngineResult<Vec<Rule>> {
        let mut rules = self.read_file(rule_type)?.rules;
        rules.sort_by_key(|r| r.sort_key());
        Ok(rules)
    }

    fn create_rule(&self, rule_type: RuleType, draft: RuleDraft) -> EngineResult<Rule> {
        draft.validate(rule_type)?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| unavailable(rule_type, format!("lock poisoned: {}", e)))?;

        let mut file = self.read_file(rule_type)?;
        ensure_unique_name(&file.rules, rule_type, &draft.name, None)?;

        let id = file.rules.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let rule = Rule::from_draft(id, draft);
        file.rules.push(rule.clone());
        self.write_file(rule_type, &file)?;

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
