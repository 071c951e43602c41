//! HTTP API module for the commerce rule engine.
//!
//! This module provides the REST endpoints for evaluating rule sets at
//! checkout and for administering rules.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{BatchEvaluateRequest, BatchItemRequest, EvaluateRequest};
pub use response::{
    ApiError, ApiErrorResponse, BatchEvaluationResponse, BatchItemResponse, EvaluationResponse,
    HealthResponse, RuleListResponse,
};
pub use state::AppState;
