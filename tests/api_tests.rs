//! Integration tests for the dashboard API endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use logistics_dashboard::api::{create_router, AppState};
use logistics_dashboard::domain::{RouteOptimizationResult, MAX_ROUTE_STOPS};
use logistics_dashboard::optimizer::{OptimizationRequest, OptimizerError, RouteOptimizer};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(state: Arc<AppState>) -> Router {
    create_router(state)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder().method(method).uri(uri).body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn has_detail(body: &Value, field: &str) -> bool {
    body["details"]
        .as_array()
        .unwrap()
        .iter()
        .any(|d| d["field"] == field)
}

async fn create_shop(router: &Router, name: &str, lat: f64, lng: f64) -> u64 {
    let (status, shop) = send(
        router,
        Method::POST,
        "/api/shops",
        Some(json!({"name": name, "latitude": lat, "longitude": lng})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    shop["id"].as_u64().unwrap()
}

// =========================================================================
// Health & stats
// =========================================================================

#[tokio::test]
async fn test_health() {
    let router = router(Arc::new(AppState::new()));
    let (status, body) = send(&router, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn test_cors_header_on_responses() {
    let router = router(Arc::new(AppState::new()));
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/shops")
        .header(header::ORIGIN, "http://dashboard.example")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_stats_reflect_store() {
    let state = Arc::new(AppState::new());
    logistics_dashboard::demo_data::seed(&state.store);
    let router = router(state.clone());

    let (status, body) = send(&router, Method::GET, "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totals"]["shops"], state.store.shops.len());
    assert_eq!(body["activeShops"], state.store.shops.len() - 1);
    assert_eq!(body["routesByStatus"]["in_progress"], 1);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let router = router(Arc::new(AppState::new()));
    let (status, body) = send(&router, Method::GET, "/api-docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/routes/{id}/optimize"].is_object());

    let patch = &body["components"]["schemas"]["RoutePatch"]["properties"];
    assert!(patch["driverId"].is_object());
    assert!(patch["shopIds"].is_object());
    assert!(body["components"]["schemas"]["NewTarget"]["properties"]["completedShops"].is_object());
}

// =========================================================================
// Shops
// =========================================================================

#[tokio::test]
async fn test_shop_defaults_applied() {
    let router = router(Arc::new(AppState::new()));
    let (status, shop) = send(
        &router,
        Method::POST,
        "/api/shops",
        Some(json!({"name": "Mama Njeri Kiosk", "latitude": -1.2633, "longitude": 36.8581})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(shop["category"], "retail");
    assert_eq!(shop["status"], "active");
    assert!(shop["id"].as_u64().is_some());
}

#[tokio::test]
async fn test_shop_without_name_rejected() {
    let state = Arc::new(AppState::new());
    let router = router(state.clone());
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/shops",
        Some(json!({"latitude": -1.26, "longitude": 36.86})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(has_detail(&body, "name"));
    assert!(state.store.shops.is_empty());
}

#[tokio::test]
async fn test_every_violation_reported() {
    let router = router(Arc::new(AppState::new()));
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/shops",
        Some(json!({"name": "", "latitude": "north", "category": 5})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["name", "latitude", "longitude", "category"] {
        assert!(has_detail(&body, field), "missing violation for {field}");
    }
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let router = router(Arc::new(AppState::new()));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/shops")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(has_detail(&body, "body"));
}

#[tokio::test]
async fn test_list_in_creation_order() {
    let router = router(Arc::new(AppState::new()));
    let first = create_shop(&router, "First", -1.28, 36.82).await;
    let second = create_shop(&router, "Second", -1.27, 36.81).await;

    let (status, shops) = send(&router, Method::GET, "/api/shops", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = shops.as_array().unwrap().iter().map(|s| s["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![first, second]);
}

// =========================================================================
// Drivers & targets
// =========================================================================

#[tokio::test]
async fn test_driver_without_vehicle_type_rejected() {
    let router = router(Arc::new(AppState::new()));
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/drivers",
        Some(json!({"name": "Otieno", "phone": "+254712345602"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_detail(&body, "vehicleType"));
}

#[tokio::test]
async fn test_driver_default_status() {
    let router = router(Arc::new(AppState::new()));
    let (status, driver) = send(
        &router,
        Method::POST,
        "/api/drivers",
        Some(json!({"name": "Otieno", "phone": "+254712345602", "vehicleType": "motorbike"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(driver["status"], "available");
    assert_eq!(driver["vehicleType"], "motorbike");
}

#[tokio::test]
async fn test_target_fractional_count_rejected() {
    let router = router(Arc::new(AppState::new()));
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/targets",
        Some(json!({
            "driverId": 1,
            "period": "weekly",
            "targetShops": 10.5,
            "targetDeliveries": 100,
            "startDate": "2026-02-16",
            "endDate": "2026-02-22"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_detail(&body, "targetShops"));
    assert!(!has_detail(&body, "targetDeliveries"));
}

#[tokio::test]
async fn test_target_patch_mistyped_field() {
    let router = router(Arc::new(AppState::new()));
    let (_, target) = send(
        &router,
        Method::POST,
        "/api/targets",
        Some(json!({
            "driverId": 1,
            "period": "weekly",
            "targetShops": 10,
            "targetDeliveries": 100,
            "startDate": "2026-02-16",
            "endDate": "2026-02-22"
        })),
    )
    .await;
    let uri = format!("/api/targets/{}", target["id"]);

    let (status, body) = send(&router, Method::PATCH, &uri, Some(json!({"completedShops": "three"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_detail(&body, "completedShops"));

    let (status, updated) = send(&router, Method::PATCH, &uri, Some(json!({"completedShops": 3}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["completedShops"], 3);
    assert_eq!(updated["targetShops"], 10);
}

// =========================================================================
// Routes end to end
// =========================================================================

#[tokio::test]
async fn test_route_lifecycle() {
    let router = router(Arc::new(AppState::new()));

    let (status, created) = send(
        &router,
        Method::POST,
        "/api/routes",
        Some(json!({"name": "R1", "date": "2026-02-18"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "planned");
    assert_eq!(created["shopIds"], json!([]));
    assert!(created["driverId"].is_null());

    let uri = format!("/api/routes/{}", created["id"]);
    let (status, fetched) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, updated) = send(&router, Method::PATCH, &uri, Some(json!({"status": "in_progress"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "in_progress");
    assert_eq!(updated["name"], "R1");
    assert_eq!(updated["date"], "2026-02-18");

    let (status, body) = send(&router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, body) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_route_patch_unassigns_driver() {
    let router = router(Arc::new(AppState::new()));
    let (_, created) = send(
        &router,
        Method::POST,
        "/api/routes",
        Some(json!({"name": "R2", "date": "2026-02-18", "driverId": 7})),
    )
    .await;
    assert_eq!(created["driverId"], 7);

    let uri = format!("/api/routes/{}", created["id"]);
    let (status, updated) = send(&router, Method::PATCH, &uri, Some(json!({"driverId": null}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["driverId"].is_null());
}

#[tokio::test]
async fn test_route_stop_limit_enforced() {
    let router = router(Arc::new(AppState::new()));
    let too_many = vec![1; MAX_ROUTE_STOPS + 1];

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/routes",
        Some(json!({"name": "Long", "date": "2026-02-18", "shopIds": too_many})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_detail(&body, "shopIds"));

    let (_, created) = send(
        &router,
        Method::POST,
        "/api/routes",
        Some(json!({"name": "Short", "date": "2026-02-18", "shopIds": [1, 2]})),
    )
    .await;
    let uri = format!("/api/routes/{}", created["id"]);
    let (status, body) = send(&router, Method::PATCH, &uri, Some(json!({"shopIds": too_many}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_detail(&body, "shopIds"));

    let (_, route) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(route["shopIds"], json!([1, 2]));
}

#[tokio::test]
async fn test_delete_twice() {
    let state = Arc::new(AppState::new());
    let router = router(state.clone());
    let id = create_shop(&router, "Gone", -1.28, 36.82).await;
    let uri = format!("/api/shops/{id}");

    let (status, _) = send(&router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(state.store.shops.is_empty());
}

#[tokio::test]
async fn test_unknown_and_non_numeric_ids() {
    let router = router(Arc::new(AppState::new()));

    let (status, _) = send(&router, Method::GET, "/api/drivers/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&router, Method::GET, "/api/drivers/abc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&router, Method::PATCH, "/api/targets/999", Some(json!({"period": "daily"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&router, Method::POST, "/api/routes/abc/optimize", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ids_distinct_across_kinds() {
    let router = router(Arc::new(AppState::new()));
    let shop = create_shop(&router, "Duka", -1.28, 36.82).await;
    let (_, driver) = send(
        &router,
        Method::POST,
        "/api/drivers",
        Some(json!({"name": "Achieng", "phone": "+254712345603", "vehicleType": "pickup"})),
    )
    .await;
    assert_ne!(driver["id"].as_u64().unwrap(), shop);
}

// =========================================================================
// Optimization
// =========================================================================

#[tokio::test]
async fn test_optimize_and_history() {
    let router = router(Arc::new(AppState::new()));
    let a = create_shop(&router, "A", -1.28, 36.70).await;
    let b = create_shop(&router, "B", -1.28, 36.90).await;
    let c = create_shop(&router, "C", -1.28, 36.80).await;

    let (_, route) = send(
        &router,
        Method::POST,
        "/api/routes",
        Some(json!({"name": "Zig-zag", "date": "2026-02-18", "shopIds": [a, b, c]})),
    )
    .await;
    let (_, other) = send(
        &router,
        Method::POST,
        "/api/routes",
        Some(json!({"name": "Other", "date": "2026-02-18", "shopIds": [c, a]})),
    )
    .await;

    let uri = format!("/api/routes/{}/optimize", route["id"]);
    let (status, record) = send(&router, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["routeId"], route["id"]);
    assert_eq!(record["optimizedOrder"], json!([a, c, b]));
    assert!(record["timeSaved"].as_f64().unwrap() > 0.0);
    assert!(record["fuelSaved"].as_f64().unwrap() > 0.0);
    assert!(record["optimizedDistance"].as_f64().unwrap() < record["originalDistance"].as_f64().unwrap());

    let other_uri = format!("/api/routes/{}/optimize", other["id"]);
    let (status, _) = send(&router, Method::POST, &other_uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = send(&router, Method::GET, "/api/optimizations", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let filtered_uri = format!("/api/optimizations?routeId={}", route["id"]);
    let (_, filtered) = send(&router, Method::GET, &filtered_uri, None).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["id"], record["id"]);

    let per_route = format!("/api/routes/{}/optimizations", other["id"]);
    let (status, entries) = send(&router, Method::GET, &per_route, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries[0]["routeId"], other["id"]);
    assert_eq!(entries.as_array().unwrap().len(), 1);

    // The stored route keeps its order
    let (_, stored) = send(&router, Method::GET, &format!("/api/routes/{}", route["id"]), None).await;
    assert_eq!(stored["shopIds"], json!([a, b, c]));
}

#[tokio::test]
async fn test_optimize_unknown_route() {
    let router = router(Arc::new(AppState::new()));
    let (status, body) = send(&router, Method::POST, "/api/routes/42/optimize", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "route 42 not found");
}

#[tokio::test]
async fn test_invalid_history_filter() {
    let router = router(Arc::new(AppState::new()));
    let (status, body) = send(&router, Method::GET, "/api/optimizations?routeId=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_detail(&body, "routeId"));
}

struct Unavailable;

impl RouteOptimizer for Unavailable {
    fn optimize(&self, _: &OptimizationRequest) -> Result<RouteOptimizationResult, OptimizerError> {
        Err(OptimizerError::Failed("routing backend unreachable at 10.0.0.4".into()))
    }
}

#[tokio::test]
async fn test_failed_optimization_not_cached() {
    let state = Arc::new(AppState::with_optimizer(Arc::new(Unavailable)));
    let router = router(state.clone());
    let a = create_shop(&router, "A", -1.28, 36.70).await;
    let (_, route) = send(
        &router,
        Method::POST,
        "/api/routes",
        Some(json!({"name": "R", "date": "2026-02-18", "shopIds": [a]})),
    )
    .await;

    let uri = format!("/api/routes/{}/optimize", route["id"]);
    let (status, body) = send(&router, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "optimization failed");
    assert!(!body.to_string().contains("10.0.0.4"));

    let (_, all) = send(&router, Method::GET, "/api/optimizations", None).await;
    assert_eq!(all, json!([]));
    assert!(state.optimization.history().is_empty());
}
