//! Response types for the commerce rule engine API.
//!
//! This module defines the evaluation envelopes and the error response
//! structures for the HTTP API.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{EvaluationResult, Rule, RuleType};

/// Envelope returned by `/evaluate/:rule_type`.
///
/// The identifier and timestamp live here, outside [`EvaluationResult`], so
/// the evaluation itself stays deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResponse {
    /// Unique identifier of this evaluation.
    pub evaluation_id: Uuid,
    /// When the evaluation ran.
    pub timestamp: DateTime<Utc>,
    /// Version of the engine that produced the result.
    pub engine_version: String,
    /// The evaluation result.
    #[serde(flatten)]
    pub result: EvaluationResult,
}

impl EvaluationResponse {
    /// Wraps a result with a fresh identifier and the current time.
    pub fn new(result: EvaluationResult) -> Self {
        Self {
            evaluation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            result,
        }
    }
}

/// One answer of a batch evaluation: either a result or an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResponse {
    /// The rule type that was evaluated.
    pub rule_type: RuleType,
    /// The result, when evaluation succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<EvaluationResult>,
    /// The error, when evaluation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

/// Envelope returned by `/evaluate/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEvaluationResponse {
    /// Unique identifier of this batch.
    pub batch_id: Uuid,
    /// When the batch ran.
    pub timestamp: DateTime<Utc>,
    /// Answers in request order.
    pub items: Vec<BatchItemResponse>,
}

/// Body returned by `GET /rules/:rule_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleListResponse {
    /// The rule type listed.
    pub rule_type: RuleType,
    /// Every rule, including inactive ones, in evaluation order.
    pub rules: Vec<Rule>,
}

/// Body returned by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the service answers.
    pub status: String,
    /// Configured service name.
    pub service: String,
    /// Configured service version.
    pub version: String,
}

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
#[derive(Debug)]
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// Creates a `400 Bad Request` response.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            Json(self.error),
        )
            .into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        let (status, code, details) = match &error {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "The engine configuration could not be loaded",
            ),
            EngineError::StorageUnavailable { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORAGE_UNAVAILABLE",
                "Rules could not be loaded; financial outcomes are not defaulted",
            ),
            EngineError::UnsupportedCalculationType { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNSUPPORTED_CALCULATION_TYPE",
                "The selected rule uses a calculation type with no evaluator",
            ),
            EngineError::CalculationOverflow { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "CALCULATION_OVERFLOW",
                "The order values are too large to price",
            ),
            EngineError::MalformedConditionClause { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MALFORMED_CONDITION",
                "A stored condition value could not be interpreted",
            ),
            EngineError::UnknownRuleType { .. } => (
                StatusCode::NOT_FOUND,
                "UNKNOWN_RULE_TYPE",
                "Expected one of pricing_display, rush_surcharge, collection_pricing",
            ),
            EngineError::RuleNotFound { .. } => (
                StatusCode::NOT_FOUND,
                "RULE_NOT_FOUND",
                "No rule with this ID exists for the rule type",
            ),
            EngineError::InvalidRule { .. } => (
                StatusCode::BAD_REQUEST,
                "INVALID_RULE",
                "The rule data contains invalid information",
            ),
            EngineError::DuplicateRuleName { .. } => (
                StatusCode::CONFLICT,
                "DUPLICATE_RULE_NAME",
                "Rule names must be unique within a rule type",
            ),
        };

        ApiErrorResponse {
            status,
            error: ApiError::with_details(code, message, details),
        }
    }
}
