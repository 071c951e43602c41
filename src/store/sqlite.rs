//! SQLite rule store.
//!
//! Rules live in one `rules` table keyed by an autoincrement id. Conditions
//! and calculation config are stored as JSON text columns and decoded on
//! read, so a malformed row surfaces as `StorageUnavailable` for its rule
//! type rather than a panic.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationType, Rule, RuleDraft, RuleType};

use super::{RuleStore, ensure_unique_name, ensure_valid, unavailable};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS rules (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    rule_type          TEXT    NOT NULL,
    name               TEXT    NOT NULL,
    priority           INTEGER NOT NULL,
    is_active          INTEGER NOT NULL DEFAULT 1,
    conditions         TEXT    NOT NULL DEFAULT '{}',
    calculation_type   TEXT    NOT NULL,
    calculation_config TEXT    NOT NULL DEFAULT '{}',
    UNIQUE (rule_type, name)
);
CREATE INDEX IF NOT EXISTS idx_rules_type_order ON rules (rule_type, priority, id);
"#;

const SELECT_COLUMNS: &str =
    "id, name, priority, is_active, conditions, calculation_type, calculation_config";

/// A rule store backed by a SQLite database.
pub struct SqliteRuleStore {
    conn: Arc<Mutex<Connection>>,
}

/// A row as read from the table, before its JSON columns are decoded.
struct RawRule {
    id: i64,
    name: String,
    priority: i32,
    is_active: bool,
    conditions: String,
    calculation_type: String,
    calculation_config: String,
}

impl RawRule {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            priority: row.get(2)?,
            is_active: row.get(3)?,
            conditions: row.get(4)?,
            calculation_type: row.get(5)?,
            calculation_config: row.get(6)?,
        })
    }

    fn decode(self, rule_type: RuleType) -> EngineResult<Rule> {
        let bad_row = |message: String| unavailable(rule_type, format!("rule {}: {}", self.id, message));

        let id = u64::try_from(self.id).map_err(|e| bad_row(e.to_string()))?;
        let conditions = serde_json::from_str(&self.conditions)
            .map_err(|e| bad_row(format!("conditions: {}", e)))?;
        let calculation_type = CalculationType::from_str(&self.calculation_type)
            .map_err(|e| bad_row(e.to_string()))?;
        let calculation_config = serde_json::from_str(&self.calculation_config)
            .map_err(|e| bad_row(format!("calculation_config: {}", e)))?;

        Ok(Rule {
            id,
            name: self.name,
            priority: self.priority,
            is_active: self.is_active,
            conditions,
            calculation_type,
            calculation_config,
        })
    }
}

impl SqliteRuleStore {
    /// Opens (or creates) a database file and ensures the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| open_error(path.as_ref(), e))?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| open_error(Path::new(":memory:"), e))?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// Wraps an existing connection and ensures the schema exists.
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> EngineResult<Self> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> EngineResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| schema_error(format!("lock poisoned: {}", e)))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| schema_error(e.to_string()))?;
        debug!("SQLite rule schema ready");
        Ok(())
    }

    fn get_conn(&self, rule_type: RuleType) -> EngineResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| unavailable(rule_type, format!("lock poisoned: {}", e)))
    }

    fn select(conn: &Connection, rule_type: RuleType, active_only: bool) -> EngineResult<Vec<Rule>> {
        let sql = format!(
            "SELECT {} FROM rules WHERE rule_type = ?1 {} ORDER BY priority ASC, id ASC",
            SELECT_COLUMNS,
            if active_only { "AND is_active = 1" } else { "" }
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| unavailable(rule_type, e))?;
        let raw = stmt
            .query_map(params![rule_type.as_str()], RawRule::from_row)
            .map_err(|e| unavailable(rule_type, e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| unavailable(rule_type, e))?;

        raw.into_iter().map(|r| r.decode(rule_type)).collect()
    }

    fn find(conn: &Connection, rule_type: RuleType, id: u64) -> EngineResult<Rule> {
        let sql = format!(
            "SELECT {} FROM rules WHERE rule_type = ?1 AND id = ?2",
            SELECT_COLUMNS
        );
        conn.query_row(&sql, params![rule_type.as_str(), to_sql_id(id)], RawRule::from_row)
            .optional()
            .map_err(|e| unavailable(rule_type, e))?
            .ok_or_else(|| EngineError::RuleNotFound {
                rule_type: rule_type.to_string(),
                id,
            })?
            .decode(rule_type)
    }
}

impl RuleStore for SqliteRuleStore {
    fn load_rules(&self, rule_type: RuleType) -> EngineResult<Vec<Rule>> {
        let conn = self.get_conn(rule_type)?;
        let rules = Self::select(&conn, rule_type, true)?;
        ensure_valid(rule_type, &rules)?;
        Ok(rules)
    }

    fn list_rules(&self, rule_type: RuleType) -> EngineResult<Vec<Rule>> {
        let conn = self.get_conn(rule_type)?;
        Self::select(&conn, rule_type, false)
    }

    fn get_rule(&self, rule_type: RuleType, id: u64) -> EngineResult<Rule> {
        let conn = self.get_conn(rule_type)?;
        Self::find(&conn, rule_type, id)
    }

    fn create_rule(&self, rule_type: RuleType, draft: RuleDraft) -> EngineResult<Rule> {
        draft.validate(rule_type)?;
        let conn = self.get_conn(rule_type)?;
        ensure_unique_name(&Self::select(&conn, rule_type, false)?, rule_type, &draft.name, None)?;

        let (conditions, config) = encode_json(rule_type, &draft)?;
        conn.execute(
            r#"
            INSERT INTO rules (
                rule_type, name, priority, is_active,
                conditions, calculation_type, calculation_config
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                rule_type.as_str(),
                draft.name,
                draft.priority,
                draft.is_active,
                conditions,
                draft.calculation_type.as_str(),
                config,
            ],
        )
        .map_err(|e| unavailable(rule_type, e))?;

        let id = u64::try_from(conn.last_insert_rowid()).map_err(|e| unavailable(rule_type, e))?;
        info!(rule_type = %rule_type, rule_id = id, name = %draft.name, "Created rule");
        Ok(Rule::from_draft(id, draft))
    }

    fn update_rule(&self, rule_type: RuleType, id: u64, draft: RuleDraft) -> EngineResult<Rule> {
        draft.validate(rule_type)?;
        let conn = self.get_conn(rule_type)?;
        Self::find(&conn, rule_type, id)?;
        ensure_unique_name(&Self::select(&conn, rule_type, false)?, rule_type, &draft.name, Some(id))?;

        let (conditions, config) = encode_json(rule_type, &draft)?;
        conn.execute(
            r#"
            UPDATE rules SET
                name = ?1, priority = ?2, is_active = ?3,
                conditions = ?4, calculation_type = ?5, calculation_config = ?6
            WHERE rule_type = ?7 AND id = ?8
            "#,
            params![
                draft.name,
                draft.priority,
                draft.is_active,
                conditions,
                draft.calculation_type.as_str(),
                config,
                rule_type.as_str(),
                to_sql_id(id),
            ],
        )
        .map_err(|e| unavailable(rule_type, e))?;

        info!(rule_type = %rule_type, rule_id = id, "Updated rule");
        Ok(Rule::from_draft(id, draft))
    }

    fn set_active(&self, rule_type: RuleType, id: u64, active: bool) -> EngineResult<Rule> {
        let conn = self.get_conn(rule_type)?;
        let changed = conn
            .execute(
                "UPDATE rules SET is_active = ?1 WHERE rule_type = ?2 AND id = ?3",
                params![active, rule_type.as_str(), to_sql_id(id)],
            )
            .map_err(|e| unavailable(rule_type, e))?;
        if changed == 0 {
            return Err(EngineError::RuleNotFound {
                rule_type: rule_type.to_string(),
                id,
            });
        }

        info!(rule_type = %rule_type, rule_id = id, active, "Changed rule activity");
        Self::find(&conn, rule_type, id)
    }
}

fn encode_json(rule_type: RuleType, draft: &RuleDraft) -> EngineResult<(String, String)> {
    let conditions =
        serde_json::to_string(&draft.conditions).map_err(|e| unavailable(rule_type, e))?;
    let config =
        serde_json::to_string(&draft.calculation_config).map_err(|e| unavailable(rule_type, e))?;
    Ok((conditions, config))
}

// Ids beyond i64::MAX cannot exist in the table, so saturating never matches a row.
fn to_sql_id(id: u64) -> i64 {
    i64::try_from(id).unwrap_or(i64::MAX)
}

fn open_error(path: &Path, err: rusqlite::Error) -> EngineError {
    EngineError::StorageUnavailable {
        rule_type: "*".to_string(),
        message: format!("{}: {}", path.display(), err),
    }
}

fn schema_error(message: String) -> EngineError {
    EngineError::StorageUnavailable {
        rule_type: "*".to_string(),
        message,
    }
}
