//! Rule evaluation for the commerce rule engine.
//!
//! This module contains the evaluation pipeline: condition matching against
//! a context, priority-ordered rule resolution, outcome calculation
//! (fixed, percentage, tier discount, caps), whole rule set evaluation with
//! explicit system defaults, per-batch rule caching, and the admin rule
//! test tool.

mod condition_matcher;
mod evaluator;
mod outcome;
mod resolver;

pub use condition_matcher::{check_clause, matches};
pub use evaluator::{
    DEFAULT_DISPLAY_STATE, DEFAULT_SURCHARGE, RuleBatch, default_outcome, evaluate,
    evaluate_with_store,
};
pub use outcome::{
    OutcomeResult, apply_caps, apply_tier_discount, base_amount, calculate_outcome, percentage_of,
};
pub use resolver::{resolve, sort_rules};
pub use rule_test::{RuleTestReport, test_rule};
