//! Core data models for the commerce rule engine.
//!
//! This module contains all the domain models used throughout the engine.

mod context;
mod evaluation_result;
mod rule;
mod rule_type;

pub use context::EvaluationContext;
pub use evaluation_result::{
    AuditStep, AuditTrace, AuditWarning, EvaluationResult, MatchedRule, Outcome,
};
pub use rule::{
    CalculationConfig, CalculationType, ClauseValue, DisplayState, Rule, RuleConditions,
    RuleDraft,
};
pub use rule_type::RuleType;
