//! End-to-end tests for the commerce rule engine HTTP API.
//!
//! This suite covers:
//! - Evaluation against the shipped YAML rule sets
//! - Priority resolution and the catch-all rule
//! - Percentage outcomes with tier discounts and caps
//! - System defaults and storage failure policy
//! - Rule administration (create, update, activate, test)
//! - Batch evaluation
//! - Error cases

use std::fs;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::str::FromStr;
use tempfile::TempDir;
use tower::ServiceExt;

use commerce_rules::api::{AppState, create_router};
use commerce_rules::config::{ConfigLoader, ServiceMetadata};
use commerce_rules::store::{InMemoryRuleStore, RuleStore, SqliteRuleStore, YamlRuleStore};

// =============================================================================
// Test Helpers
// =============================================================================

fn service() -> ServiceMetadata {
    ServiceMetadata {
        name: "commerce-rules".to_string(),
        version: "test".to_string(),
    }
}

fn router_with_store(store: impl RuleStore + 'static) -> Router {
    create_router(AppState::new(Arc::new(store), service()))
}

fn shipped_router() -> Router {
    let loader = ConfigLoader::load("./config").expect("Failed to load config");
    let store = loader.build_store().expect("Failed to build store");
    create_router(AppState::new(store, loader.config().service.clone()))
}

/// Copies the shipped rule files into a scratch directory for write tests.
fn scratch_rules() -> TempDir {
    let dir = TempDir::new().unwrap();
    for entry in fs::read_dir("./config/rules").unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap();
        fs::copy(&path, dir.path().join(name)).unwrap();
    }
    dir
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Reads an amount outcome from an evaluation body.
fn amount(body: &Value) -> Decimal {
    assert_eq!(body["outcome"]["kind"], "amount", "body: {}", body);
    decimal(body["outcome"]["value"].as_str().unwrap())
}

async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    let request = match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();
    (status, json)
}

async fn evaluate(router: Router, rule_type: &str, context: Value) -> (StatusCode, Value) {
    send(router, "POST", &format!("/evaluate/{}", rule_type), Some(context)).await
}

fn fixed_rule(name: &str, priority: i32, conditions: Value, amount: &str) -> Value {
    json!({
        "name": name,
        "priority": priority,
        "conditions": conditions,
        "calculation_type": "fixed",
        "calculation_config": { "fixedAmount": amount }
    })
}

// =============================================================================
// Shipped rule sets
// =============================================================================

#[tokio::test]
async fn test_vip_rush_is_free() {
    let (status, body) = evaluate(
        shipped_router(),
        "rush_surcharge",
        json!({ "amount": "80", "customer_tier": "VIP" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched_rule"]["name"], "VIP rush");
    assert_eq!(amount(&body), Decimal::ZERO);
}

#[tokio::test]
async fn test_small_order_percentage_is_raised_to_min_cap() {
    // 15% of 10 is 1.5, below the 5 minimum
    let (status, body) = evaluate(shipped_router(), "rush_surcharge", json!({ "amount": "10" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched_rule"]["id"], 2);
    assert_eq!(amount(&body), decimal("5"));

    let steps: Vec<&str> = body["audit_trace"]["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["step_id"].as_str().unwrap())
        .collect();
    assert!(steps.contains(&"cap_clamp"), "steps: {:?}", steps);
}

#[tokio::test]
async fn test_small_order_percentage_within_caps() {
    let (_, body) = evaluate(shipped_router(), "rush_surcharge", json!({ "amount": "80" })).await;
    assert_eq!(amount(&body).normalize(), decimal("12"));
}

#[tokio::test]
async fn test_standard_rush_applies_tier_discount() {
    // 10% of 500 = 50, gold discount 25% = 37.5
    let (_, body) = evaluate(
        shipped_router(),
        "rush_surcharge",
        json!({ "amount": "500", "customer_tier": "gold" }),
    )
    .await;

    assert_eq!(body["matched_rule"]["name"], "Standard rush");
    assert_eq!(amount(&body).normalize(), decimal("37.5"));
}

#[tokio::test]
async fn test_standard_rush_is_capped() {
    let (_, body) = evaluate(shipped_router(), "rush_surcharge", json!({ "amount": "2000" })).await;
    assert_eq!(amount(&body), decimal("150"));
}

#[tokio::test]
async fn test_large_order_requests_quote() {
    let (status, body) = evaluate(shipped_router(), "pricing_display", json!({ "amount": "6000" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["kind"], "display");
    assert_eq!(body["outcome"]["value"], "request_quote");
}

#[tokio::test]
async fn test_flagged_customer_prices_hidden() {
    let (_, body) = evaluate(
        shipped_router(),
        "pricing_display",
        json!({ "amount": "100", "violation_score": "85" }),
    )
    .await;
    assert_eq!(body["outcome"]["value"], "hide");
}

#[tokio::test]
async fn test_unmatched_display_defaults_to_show() {
    // The overnight hide rule is inactive
    let (_, body) = evaluate(
        shipped_router(),
        "pricing_display",
        json!({ "amount": "100", "at": "2026-01-13T23:00:00" }),
    )
    .await;

    assert_eq!(body["used_default"], true);
    assert!(body["matched_rule"].is_null());
    assert_eq!(body["outcome"]["value"], "show");
}

#[tokio::test]
async fn test_sunday_collection() {
    let (_, body) = evaluate(
        shipped_router(),
        "collection_pricing",
        json!({ "amount": "40", "at": "2026-01-18T10:00:00" }),
    )
    .await;
    assert_eq!(body["matched_rule"]["name"], "Sunday collection");
    assert_eq!(amount(&body), decimal("45.00"));
}

#[tokio::test]
async fn test_early_morning_collection() {
    let (_, body) = evaluate(
        shipped_router(),
        "collection_pricing",
        json!({ "amount": "40", "at": "2026-01-19T06:30:00" }),
    )
    .await;
    assert_eq!(amount(&body), decimal("25.00"));
}

#[tokio::test]
async fn test_daytime_collection_uses_default_zero() {
    let (status, body) = evaluate(
        shipped_router(),
        "collection_pricing",
        json!({ "amount": "40", "at": "2026-01-19T12:00:00" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["used_default"], true);
    assert_eq!(amount(&body), Decimal::ZERO);
}

// =============================================================================
// Resolution scenarios
// =============================================================================

#[tokio::test]
async fn test_conditioned_rule_shadows_catch_all() {
    let router = router_with_store(InMemoryRuleStore::new());
    send(
        router.clone(),
        "POST",
        "/rules/rush_surcharge",
        Some(fixed_rule("A", 1, json!({ "customerTier": "VIP" }), "3")),
    )
    .await;
    send(
        router.clone(),
        "POST",
        "/rules/rush_surcharge",
        Some(fixed_rule("B", 2, json!({}), "10")),
    )
    .await;

    let (_, vip) = evaluate(
        router.clone(),
        "rush_surcharge",
        json!({ "amount": "50", "customer_tier": "VIP" }),
    )
    .await;
    assert_eq!(vip["matched_rule"]["name"], "A");

    let (_, regular) = evaluate(
        router,
        "rush_surcharge",
        json!({ "amount": "50", "customer_tier": "regular" }),
    )
    .await;
    assert_eq!(regular["matched_rule"]["name"], "B");
    assert_eq!(amount(&regular), decimal("10"));
}

#[tokio::test]
async fn test_lower_priority_wins_regardless_of_insertion_order() {
    let router = router_with_store(InMemoryRuleStore::new());
    send(
        router.clone(),
        "POST",
        "/rules/collection_pricing",
        Some(fixed_rule("five", 5, json!({}), "5")),
    )
    .await;
    send(
        router.clone(),
        "POST",
        "/rules/collection_pricing",
        Some(fixed_rule("three", 3, json!({}), "3")),
    )
    .await;

    let (_, body) = evaluate(router, "collection_pricing", json!({ "amount": "1" })).await;
    assert_eq!(body["matched_rule"]["name"], "three");
    assert_eq!(body["matched_rule"]["priority"], 3);
}

#[tokio::test]
async fn test_equal_priority_prefers_smallest_id() {
    let router = router_with_store(InMemoryRuleStore::new());
    let (_, first) = send(
        router.clone(),
        "POST",
        "/rules/rush_surcharge",
        Some(fixed_rule("first", 1, json!({}), "1")),
    )
    .await;
    send(
        router.clone(),
        "POST",
        "/rules/rush_surcharge",
        Some(fixed_rule("second", 1, json!({}), "2")),
    )
    .await;

    let (_, body) = evaluate(router, "rush_surcharge", json!({ "amount": "1" })).await;
    assert_eq!(body["matched_rule"]["id"], first["id"]);
}

// =============================================================================
// Failure policy
// =============================================================================

#[tokio::test]
async fn test_unavailable_storage_degrades_display_to_show() {
    let router = router_with_store(YamlRuleStore::new("/nonexistent/rules"));
    let (status, body) = evaluate(router, "pricing_display", json!({ "amount": "100" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["value"], "show");
    assert_eq!(body["audit_trace"]["warnings"][0]["code"], "STORAGE_FALLBACK");
}

#[tokio::test]
async fn test_unavailable_storage_fails_surcharge() {
    let router = router_with_store(YamlRuleStore::new("/nonexistent/rules"));
    let (status, body) = evaluate(router, "rush_surcharge", json!({ "amount": "100" })).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "STORAGE_UNAVAILABLE");
}

#[tokio::test]
async fn test_invalid_stored_rule_is_treated_as_unavailable() {
    let dir = TempDir::new().unwrap();
    let bad_rule = r#"
rules:
  - id: 1
    name: Generous gold
    priority: 1
    calculation_type: percentageOfSubtotal
    calculation_config:
      percentage: "10"
      tierDiscounts:
        gold: "150"
"#;
    fs::write(dir.path().join("rush_surcharge.yaml"), bad_rule).unwrap();
    fs::write(dir.path().join("pricing_display.yaml"), bad_rule).unwrap();
    let router = router_with_store(YamlRuleStore::new(dir.path()));

    let context = json!({ "amount": "100", "customer_tier": "gold" });
    let (status, body) = evaluate(router.clone(), "rush_surcharge", context.clone()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "STORAGE_UNAVAILABLE");

    let (status, body) = evaluate(router, "pricing_display", context).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["value"], "show");
    assert_eq!(body["audit_trace"]["warnings"][0]["code"], "STORAGE_FALLBACK");
}

#[tokio::test]
async fn test_selected_tiered_rule_is_unsupported() {
    let router = router_with_store(InMemoryRuleStore::new());
    let (status, _) = send(
        router.clone(),
        "POST",
        "/rules/rush_surcharge",
        Some(json!({
            "name": "Stepped",
            "priority": 1,
            "calculation_type": "tiered",
            "calculation_config": { "tiers": [] }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = evaluate(router, "rush_surcharge", json!({ "amount": "100" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "UNSUPPORTED_CALCULATION_TYPE");
}

#[tokio::test]
async fn test_malformed_clause_fails_closed() {
    let router = router_with_store(InMemoryRuleStore::new());
    send(
        router.clone(),
        "POST",
        "/rules/rush_surcharge",
        Some(fixed_rule("broken", 1, json!({ "orderValueMin": "abc" }), "99")),
    )
    .await;

    let (status, body) = evaluate(router, "rush_surcharge", json!({ "amount": "100" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["used_default"], true);
}

// =============================================================================
// Administration
// =============================================================================

#[tokio::test]
async fn test_yaml_admin_round_trip() {
    let dir = scratch_rules();
    let router = router_with_store(YamlRuleStore::new(dir.path()));

    let (status, created) = send(
        router.clone(),
        "POST",
        "/rules/rush_surcharge",
        Some(fixed_rule("Gold rush", 0, json!({ "customerTier": "gold" }), "7.50")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 4);

    let (_, body) = evaluate(
        router.clone(),
        "rush_surcharge",
        json!({ "amount": "500", "customer_tier": "gold" }),
    )
    .await;
    assert_eq!(body["matched_rule"]["name"], "Gold rush");

    let (status, updated) = send(
        router.clone(),
        "PUT",
        "/rules/rush_surcharge/4",
        Some(fixed_rule("Gold rush", 20, json!({ "customerTier": "gold" }), "7.50")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["priority"], 20);

    let (_, body) = evaluate(
        router.clone(),
        "rush_surcharge",
        json!({ "amount": "500", "customer_tier": "gold" }),
    )
    .await;
    assert_eq!(body["matched_rule"]["name"], "Standard rush");

    let (status, list) = send(router, "GET", "/rules/rush_surcharge", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["rules"].as_array().unwrap().len(), 4);
    assert!(dir.path().join("rush_surcharge.yaml").exists());
}

#[tokio::test]
async fn test_sqlite_admin_round_trip() {
    let router = router_with_store(SqliteRuleStore::open_in_memory().unwrap());

    let (status, created) = send(
        router.clone(),
        "POST",
        "/rules/collection_pricing",
        Some(fixed_rule("Sunday", 1, json!({ "dayOfWeek": 0 }), "45.00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let sunday = json!({ "amount": "10", "at": "2026-01-18T12:00:00" });
    let (status, body) = evaluate(router.clone(), "collection_pricing", sunday.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matched_rule"]["id"], created["id"]);
    assert_eq!(amount(&body), decimal("45"));

    let uri = format!("/rules/collection_pricing/{}/deactivate", created["id"]);
    let (status, _) = send(router.clone(), "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = evaluate(router, "collection_pricing", sunday).await;
    assert_eq!(body["used_default"], true);
}

#[tokio::test]
async fn test_activate_restores_rule() {
    let dir = scratch_rules();
    let router = router_with_store(YamlRuleStore::new(dir.path()));

    let (status, rule) = send(router.clone(), "POST", "/rules/pricing_display/3/activate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rule["is_active"], true);

    let (_, body) = evaluate(
        router,
        "pricing_display",
        json!({ "amount": "100", "at": "2026-01-13T23:00:00" }),
    )
    .await;
    assert_eq!(body["outcome"]["value"], "hide");
}

#[tokio::test]
async fn test_duplicate_name_returns_409() {
    let dir = scratch_rules();
    let router = router_with_store(YamlRuleStore::new(dir.path()));
    let (status, body) = send(
        router,
        "POST",
        "/rules/rush_surcharge",
        Some(fixed_rule("VIP rush", 9, json!({}), "1")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_RULE_NAME");
}

#[tokio::test]
async fn test_invalid_rule_returns_400() {
    let router = router_with_store(InMemoryRuleStore::new());
    let (status, body) = send(
        router,
        "POST",
        "/rules/rush_surcharge",
        Some(json!({
            "name": "Inverted caps",
            "priority": 1,
            "calculation_type": "percentageOfSubtotal",
            "calculation_config": { "percentage": "10", "minCap": "50", "maxCap": "5" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_RULE");
}

#[tokio::test]
async fn test_unknown_condition_key_is_rejected() {
    let router = router_with_store(InMemoryRuleStore::new());
    let (status, body) = send(
        router,
        "POST",
        "/rules/rush_surcharge",
        Some(fixed_rule("typo", 1, json!({ "customerTeir": "VIP" }), "1")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_JSON");
}

#[tokio::test]
async fn test_missing_rule_returns_404() {
    let (status, body) = send(shipped_router(), "GET", "/rules/rush_surcharge/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "RULE_NOT_FOUND");
}

#[tokio::test]
async fn test_rule_test_tool_reports_inactive_rule() {
    let (status, body) = send(
        shipped_router(),
        "POST",
        "/rules/collection_pricing/3/test",
        Some(json!({ "amount": "40", "at": "2026-01-19T21:00:00" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);
    assert_eq!(body["conditions_match"], true);
    assert_eq!(body["is_selected"], false);
    assert!(body["rule_error"].as_str().unwrap().contains("tiered"));
    assert_eq!(body["evaluation"]["used_default"], true);
}

// =============================================================================
// Batch evaluation
// =============================================================================

#[tokio::test]
async fn test_batch_answers_in_order() {
    let (status, body) = send(
        shipped_router(),
        "POST",
        "/evaluate/batch",
        Some(json!({
            "items": [
                { "rule_type": "rush_surcharge", "context": { "amount": "10" } },
                { "rule_type": "pricing_display", "context": { "amount": "6000" } },
                { "rule_type": "rush_surcharge", "context": { "amount": "2000" } }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(amount(&items[0]["result"]), decimal("5"));
    assert_eq!(items[1]["result"]["outcome"]["value"], "request_quote");
    assert_eq!(amount(&items[2]["result"]), decimal("150"));
}

#[tokio::test]
async fn test_batch_reports_overflow_inline() {
    let (status, body) = send(
        shipped_router(),
        "POST",
        "/evaluate/batch",
        Some(json!({
            "items": [
                { "rule_type": "rush_surcharge", "context": { "amount": "79228162514264337593543950335" } },
                { "rule_type": "rush_surcharge", "context": { "amount": "50" } }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["error"]["code"], "CALCULATION_OVERFLOW");
    assert_eq!(amount(&body["items"][1]["result"]), decimal("7.5"));
}

#[tokio::test]
async fn test_batch_reports_item_errors_inline() {
    let router = router_with_store(YamlRuleStore::new("/nonexistent/rules"));
    let (status, body) = send(
        router,
        "POST",
        "/evaluate/batch",
        Some(json!({
            "items": [
                { "rule_type": "pricing_display", "context": { "amount": "1" } },
                { "rule_type": "collection_pricing", "context": { "amount": "1" } }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["result"]["outcome"]["value"], "show");
    assert_eq!(body["items"][1]["error"]["code"], "STORAGE_UNAVAILABLE");
}

// =============================================================================
// Error cases
// =============================================================================

#[tokio::test]
async fn test_unknown_rule_type_returns_404() {
    let (status, body) = evaluate(shipped_router(), "gift_wrap", json!({ "amount": "1" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "UNKNOWN_RULE_TYPE");
}

#[tokio::test]
async fn test_invalid_amount_returns_400() {
    let (status, body) = evaluate(
        shipped_router(),
        "rush_surcharge",
        json!({ "amount": "lots" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_JSON");
}

#[tokio::test]
async fn test_max_amount_surcharge_returns_422() {
    let (status, body) = evaluate(
        shipped_router(),
        "rush_surcharge",
        json!({ "amount": "79228162514264337593543950335", "customer_tier": "regular" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "CALCULATION_OVERFLOW");
}
