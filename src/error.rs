//! Error types for the commerce rule engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while loading, storing and
//! evaluating rules.

use thiserror::Error;

/// The main error type for the commerce rule engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use commerce_rules::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/engine.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/engine.yaml");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// The rule store could not be read or written.
    #[error("Rule storage unavailable for '{rule_type}': {message}")]
    StorageUnavailable {
        /// The rule type (namespace) being accessed.
        rule_type: String,
        /// A description of the storage failure.
        message: String,
    },

    /// The selected rule uses a calculation type with no evaluator.
    #[error("Calculation type '{calculation_type}' of rule {rule_id} is not supported")]
    UnsupportedCalculationType {
        /// The ID of the rule that was selected.
        rule_id: u64,
        /// The unsupported calculation type.
        calculation_type: String,
    },

    /// An outcome amount left the representable `Decimal` range.
    #[error("Calculation overflowed: {operation}")]
    CalculationOverflow {
        /// The arithmetic that overflowed (e.g. `10% of 7922...`).
        operation: String,
    },

    /// A stored condition value could not be parsed as its expected type.
    #[error("Malformed condition clause '{clause}' with value '{value}': {message}")]
    MalformedConditionClause {
        /// The clause key (e.g. `orderValueMin`).
        clause: String,
        /// The raw stored value.
        value: String,
        /// What was expected.
        message: String,
    },

    /// A rule type identifier did not name a known rule family.
    #[error("Unknown rule type: {value}")]
    UnknownRuleType {
        /// The identifier that was supplied.
        value: String,
    },

    /// No rule exists with the given ID in the rule set.
    #[error("Rule {id} not found in '{rule_type}'")]
    RuleNotFound {
        /// The rule type that was searched.
        rule_type: String,
        /// The rule ID that was not found.
        id: u64,
    },

    /// A rule definition was invalid or inconsistent.
    #[error("Invalid rule field '{field}': {message}")]
    InvalidRule {
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// Another rule in the same rule set already uses this name.
    #[error("Rule name '{name}' already exists in '{rule_type}'")]
    DuplicateRuleName {
        /// The rule type the name collides in.
        rule_type: String,
        /// The duplicated name.
        name: String,
    },
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
