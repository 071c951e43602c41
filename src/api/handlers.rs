//! HTTP request handlers for the commerce rule engine API.
//!
//! This module contains the handler functions for all API endpoints.
//! Store backends read files or hold a synchronous SQLite lock, so every
//! store call runs on tokio's blocking pool through `with_store`.

use std::str::FromStr;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::evaluation::{RuleBatch, evaluate_with_store, test_rule};
use crate::models::{RuleDraft, RuleType};
use crate::store::RuleStore;

use super::request::{BatchEvaluateRequest, EvaluateRequest};
use super::response::{
    ApiError, ApiErrorResponse, BatchEvaluationResponse, BatchItemResponse, EvaluationResponse,
    HealthResponse, RuleListResponse,
};
use super::state::AppState;

type HandlerResult = Result<Response, ApiErrorResponse>;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/evaluate/batch", post(batch_evaluate_handler))
        .route("/evaluate/:rule_type", post(evaluate_handler))
        .route(
            "/rules/:rule_type",
            get(list_rules_handler).post(create_rule_handler),
        )
        .route(
            "/rules/:rule_type/:id",
            get(get_rule_handler).put(update_rule_handler),
        )
        .route("/rules/:rule_type/:id/activate", post(activate_rule_handler))
        .route(
            "/rules/:rule_type/:id/deactivate",
            post(deactivate_rule_handler),
        )
        .route("/rules/:rule_type/:id/test", post(test_rule_handler))
        .with_state(state)
}

/// Handler for GET /health.
async fn health_handler(State(state): State<AppState>) -> Response {
    let service = state.service();
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok".to_string(),
            service: service.name.clone(),
            version: service.version.clone(),
        },
    )
}

/// Handler for POST /evaluate/:rule_type.
///
/// Loads the rule set fresh from the store and evaluates the context.
async fn evaluate_handler(
    State(state): State<AppState>,
    Path(rule_type): Path<String>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let rule_type = parse_rule_type(correlation_id, &rule_type)?;
    info!(correlation_id = %correlation_id, rule_type = %rule_type, "Processing evaluation request");

    let Json(request) = payload.map_err(|r| json_rejection(correlation_id, r))?;
    let context = request.into_context(Utc::now().naive_utc());

    let start_time = Instant::now();
    let outcome = with_store(&state, move |store| {
        evaluate_with_store(store, rule_type, &context)
    })
    .await;
    match outcome {
        Ok(result) => {
            info!(
                correlation_id = %correlation_id,
                rule_type = %rule_type,
                matched_rule = ?result.matched_rule.as_ref().map(|m| m.id),
                used_default = result.used_default,
                duration_us = start_time.elapsed().as_micros(),
                "Evaluation completed"
            );
            Ok(json_response(
                StatusCode::OK,
                &EvaluationResponse::new(result),
            ))
        }
        Err(err) => Err(engine_error(correlation_id, "Evaluation failed", err)),
    }
}

/// Handler for POST /evaluate/batch.
///
/// Every item shares one [`RuleBatch`], so each rule type is loaded at most
/// once per request. Item failures are reported inline.
async fn batch_evaluate_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchEvaluateRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let Json(request) = payload.map_err(|r| json_rejection(correlation_id, r))?;
    info!(
        correlation_id = %correlation_id,
        items = request.items.len(),
        "Processing batch evaluation request"
    );

    let now = Utc::now().naive_utc();
    let (items, rule_types_loaded) = with_store(&state, move |store| {
        let mut batch = RuleBatch::new(store);
        let items: Vec<BatchItemResponse> = request
            .items
            .into_iter()
            .map(|item| {
                let rule_type = item.rule_type;
                match batch.evaluate(rule_type, &item.context.into_context(now)) {
                    Ok(result) => BatchItemResponse {
                        rule_type,
                        result: Some(result),
                        error: None,
                    },
                    Err(err) => {
                        warn!(correlation_id = %correlation_id, rule_type = %rule_type, error = %err, "Batch item failed");
                        BatchItemResponse {
                            rule_type,
                            result: None,
                            error: Some(ApiErrorResponse::from(err).error),
                        }
                    }
                }
            })
            .collect();
        Ok((items, batch.loaded_rule_types()))
    })
    .await
    .map_err(|e| engine_error(correlation_id, "Batch evaluation failed", e))?;

    info!(
        correlation_id = %correlation_id,
        rule_types_loaded,
        "Batch evaluation completed"
    );
    Ok(json_response(
        StatusCode::OK,
        &BatchEvaluationResponse {
            batch_id: correlation_id,
            timestamp: Utc::now(),
            items,
        },
    ))
}

/// Handler for GET /rules/:rule_type.
async fn list_rules_handler(
    State(state): State<AppState>,
    Path(rule_type): Path<String>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let rule_type = parse_rule_type(correlation_id, &rule_type)?;
    let rules = with_store(&state, move |store| store.list_rules(rule_type))
        .await
        .map_err(|e| engine_error(correlation_id, "Listing rules failed", e))?;
    Ok(json_response(
        StatusCode::OK,
        &RuleListResponse { rule_type, rules },
    ))
}

/// Handler for GET /rules/:rule_type/:id.
async fn get_rule_handler(
    State(state): State<AppState>,
    Path((rule_type, id)): Path<(String, u64)>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let rule_type = parse_rule_type(correlation_id, &rule_type)?;
    let rule = with_store(&state, move |store| store.get_rule(rule_type, id))
        .await
        .map_err(|e| engine_error(correlation_id, "Fetching rule failed", e))?;
    Ok(json_response(StatusCode::OK, &rule))
}

/// Handler for POST /rules/:rule_type.
async fn create_rule_handler(
    State(state): State<AppState>,
    Path(rule_type): Path<String>,
    payload: Result<Json<RuleDraft>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let rule_type = parse_rule_type(correlation_id, &rule_type)?;
    let Json(draft) = payload.map_err(|r| json_rejection(correlation_id, r))?;

    let rule = with_store(&state, move |store| store.create_rule(rule_type, draft))
        .await
        .map_err(|e| engine_error(correlation_id, "Creating rule failed", e))?;
    info!(correlation_id = %correlation_id, rule_type = %rule_type, rule_id = rule.id, "Rule created");
    Ok(json_response(StatusCode::CREATED, &rule))
}

/// Handler for PUT /rules/:rule_type/:id.
async fn update_rule_handler(
    State(state): State<AppState>,
    Path((rule_type, id)): Path<(String, u64)>,
    payload: Result<Json<RuleDraft>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let rule_type = parse_rule_type(correlation_id, &rule_type)?;
    let Json(draft) = payload.map_err(|r| json_rejection(correlation_id, r))?;

    let rule = with_store(&state, move |store| store.update_rule(rule_type, id, draft))
        .await
        .map_err(|e| engine_error(correlation_id, "Updating rule failed", e))?;
    Ok(json_response(StatusCode::OK, &rule))
}

/// Handler for POST /rules/:rule_type/:id/activate.
async fn activate_rule_handler(
    state: State<AppState>,
    path: Path<(String, u64)>,
) -> HandlerResult {
    set_active(state, path, true).await
}

/// Handler for POST /rules/:rule_type/:id/deactivate.
async fn deactivate_rule_handler(
    state: State<AppState>,
    path: Path<(String, u64)>,
) -> HandlerResult {
    set_active(state, path, false).await
}

async fn set_active(
    State(state): State<AppState>,
    Path((rule_type, id)): Path<(String, u64)>,
    active: bool,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let rule_type = parse_rule_type(correlation_id, &rule_type)?;
    let rule = with_store(&state, move |store| store.set_active(rule_type, id, active))
        .await
        .map_err(|e| engine_error(correlation_id, "Changing rule activity failed", e))?;
    Ok(json_response(StatusCode::OK, &rule))
}

/// Handler for POST /rules/:rule_type/:id/test.
///
/// Runs the admin test tool against the full rule set, inactive rules
/// included, so a disabled rule can be checked before it is switched on.
async fn test_rule_handler(
    State(state): State<AppState>,
    Path((rule_type, id)): Path<(String, u64)>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> HandlerResult {
    let correlation_id = Uuid::new_v4();
    let rule_type = parse_rule_type(correlation_id, &rule_type)?;
    let Json(request) = payload.map_err(|r| json_rejection(correlation_id, r))?;
    let context = request.into_context(Utc::now().naive_utc());

    let report = with_store(&state, move |store| {
        let rules = store.list_rules(rule_type)?;
        test_rule(rule_type, &rules, id, &context)
    })
    .await
    .map_err(|e| engine_error(correlation_id, "Rule test failed", e))?;
    Ok(json_response(StatusCode::OK, &report))
}

/// Runs `work` against the store on the blocking pool.
async fn with_store<T, F>(state: &AppState, work: F) -> Result<T, EngineError>
where
    F: FnOnce(&dyn RuleStore) -> Result<T, EngineError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store_handle();
    tokio::task::spawn_blocking(move || work(store.as_ref()))
        .await
        .map_err(|e| EngineError::StorageUnavailable {
            rule_type: "*".to_string(),
            message: format!("store task failed: {}", e),
        })?
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn parse_rule_type(correlation_id: Uuid, value: &str) -> Result<RuleType, ApiErrorResponse> {
    RuleType::from_str(value).map_err(|e| engine_error(correlation_id, "Unknown rule type", e))
}

fn engine_error(correlation_id: Uuid, context: &str, err: EngineError) -> ApiErrorResponse {
    warn!(correlation_id = %correlation_id, error = %err, "{}", context);
    err.into()
}

fn json_rejection(correlation_id: Uuid, rejection: JsonRejection) -> ApiErrorResponse {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // The body text carries serde's detailed message
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::new("VALIDATION_ERROR", body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    ApiErrorResponse::bad_request(error)
}
