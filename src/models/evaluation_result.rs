//! Evaluation result models.
//!
//! This module contains the [`EvaluationResult`] type and its associated
//! structures that capture the outcome of a rule evaluation, which rule (if
//! any) produced it, and an audit trace of every decision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{DisplayState, Rule, RuleType};

/// The value produced by an evaluation.
///
/// # Example
///
/// ```
/// use commerce_rules::models::{DisplayState, Outcome};
/// use rust_decimal::Decimal;
///
/// let outcome = Outcome::Amount(Decimal::new(10, 0));
/// assert_eq!(outcome.amount(), Some(Decimal::new(10, 0)));
/// assert_eq!(Outcome::Display(DisplayState::Hide).amount(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    /// A monetary amount (surcharge or price).
    Amount(Decimal),
    /// A price display state.
    Display(DisplayState),
}

impl Outcome {
    /// Returns the amount if this is a monetary outcome.
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Outcome::Amount(amount) => Some(*amount),
            Outcome::Display(_) => None,
        }
    }

    /// Returns the display state if this is a display outcome.
    pub fn display(&self) -> Option<DisplayState> {
        match self {
            Outcome::Display(state) => Some(*state),
            Outcome::Amount(_) => None,
        }
    }
}

/// Identifies the rule that produced an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRule {
    /// The rule ID.
    pub id: u64,
    /// The rule name.
    pub name: String,
    /// The rule priority.
    pub priority: i32,
}

impl From<&Rule> for MatchedRule {
    fn from(rule: &Rule) -> Self {
        MatchedRule {
            id: rule.id,
            name: rule.name.clone(),
            priority: rule.priority,
        }
    }
}

/// A single step in the audit trace recording an evaluation decision.
///
/// Each step captures the input, output, and reasoning for a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The identifier of the evaluation stage (e.g. "rule_selection").
    pub step_id: String,
    /// The human-readable name of the stage.
    pub step_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during evaluation.
///
/// Warnings indicate issues that did not prevent an outcome but may
/// require attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The audit trace of one evaluation.
///
/// # Example
///
/// ```
/// use commerce_rules::models::AuditTrace;
///
/// let trace = AuditTrace::default();
/// assert!(trace.steps.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of evaluation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during evaluation.
    pub warnings: Vec<AuditWarning>,
}

impl AuditTrace {
    /// Appends a step, numbering it after the existing ones.
    pub fn push_step(
        &mut self,
        step_id: &str,
        step_name: &str,
        input: serde_json::Value,
        output: serde_json::Value,
        reasoning: String,
    ) {
        let step_number = self.steps.len() as u32 + 1;
        self.steps.push(AuditStep {
            step_number,
            step_id: step_id.to_string(),
            step_name: step_name.to_string(),
            input,
            output,
            reasoning,
        });
    }

    /// Appends a warning.
    pub fn warn(&mut self, code: &str, message: impl Into<String>, severity: &str) {
        self.warnings.push(AuditWarning {
            code: code.to_string(),
            message: message.into(),
            severity: severity.to_string(),
        });
    }
}

/// The complete result of evaluating a rule set against a context.
///
/// The result holds no timestamps or generated identifiers, so evaluating
/// the same rules and context twice yields equal results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// The rule type that was evaluated.
    pub rule_type: RuleType,
    /// The rule that produced the outcome, or `None` when the default applied.
    pub matched_rule: Option<MatchedRule>,
    /// The final outcome.
    pub outcome: Outcome,
    /// True when no rule matched and the system default was used.
    pub used_default: bool,
    /// The audit trace of the evaluation.
    pub audit_trace: AuditTrace,
}
