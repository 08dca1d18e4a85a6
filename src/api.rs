//! REST API for the logistics dashboard.
//!
//! Provides endpoints for:
//! - CRUD on shops, drivers, routes and targets under `/api/{collection}`
//! - Route optimization and its history
//! - Health and dashboard statistics
//! - Swagger UI at /swagger-ui
//!
//! Request bodies are taken as raw JSON and checked by [`Validated`], so
//! every violated field is reported in one 400 response. A path id that is
//! not a number cannot name a record and yields 404.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::domain::{
    Driver, DriverPatch, DriverStatus, EntityId, EntityKind, NewDriver, NewRoute, NewShop, NewTarget,
    OptimizationRecord, Route, RouteOptimizationResult, RoutePatch, RouteStatus, Shop, ShopPatch, Target,
    TargetPatch,
};
use crate::error::{ApiError, ErrorBody};
use crate::optimization::OptimizationService;
use crate::optimizer::{NearestNeighbourOptimizer, RouteOptimizer};
use crate::stats::{DashboardStats, TargetCompletion, Totals};
use crate::store::{EntityStore, Stored};
use crate::validation::{FieldError, Validated, ValidationErrors};

/// Application state shared across handlers.
pub struct AppState {
    pub store: EntityStore,
    pub optimization: OptimizationService,
}

impl AppState {
    /// Empty store with the default optimizer.
    pub fn new() -> Self {
        Self::with_optimizer(Arc::new(NearestNeighbourOptimizer::default()))
    }

    pub fn with_optimizer(optimizer: Arc<dyn RouteOptimizer>) -> Self {
        Self {
            store: EntityStore::new(),
            optimization: OptimizationService::new(optimizer),
        }
    }

    /// Empty store with the optimizer tuned by `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        let optimizer = NearestNeighbourOptimizer::new(config.average_speed_kmph, config.fuel_l_per_100km);
        Self {
            store: EntityStore::new(),
            optimization: OptimizationService::new(Arc::new(optimizer))
                .with_timeout(config.optimize_timeout)
                .with_console(config.console),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates the API router with CORS, request tracing, panic recovery and Swagger UI.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        // Health & stats
        .route("/api/health", get(health))
        .route("/api/stats", get(stats))
        // Shops
        .route("/api/shops", get(list_shops).post(create_shop))
        .route("/api/shops/{id}", get(get_shop).patch(update_shop).delete(delete_shop))
        // Drivers
        .route("/api/drivers", get(list_drivers).post(create_driver))
        .route(
            "/api/drivers/{id}",
            get(get_driver).patch(update_driver).delete(delete_driver),
        )
        // Routes
        .route("/api/routes", get(list_routes).post(create_route))
        .route("/api/routes/{id}", get(get_route).patch(update_route).delete(delete_route))
        .route("/api/routes/{id}/optimize", post(optimize_route))
        .route("/api/routes/{id}/optimizations", get(route_optimizations))
        // Targets
        .route("/api/targets", get(list_targets).post(create_target))
        .route(
            "/api/targets/{id}",
            get(get_target).patch(update_target).delete(delete_target),
        )
        // Optimization history
        .route("/api/optimizations", get(list_optimizations))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Turns a handler panic into a generic 500 body; the panic message is only logged.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(detail).into_response()
}

// ============================================================================
// Generic CRUD
// ============================================================================

fn parse_id(kind: EntityKind, raw: &str) -> Result<EntityId, ApiError> {
    raw.parse().map_err(|_| ApiError::UnknownId {
        kind,
        raw: raw.to_string(),
    })
}

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        ApiError::Validation(ValidationErrors {
            errors: vec![FieldError {
                field: "body".to_string(),
                message: rejection.body_text(),
            }],
        })
    })
}

fn list_records<T: Stored>(state: &AppState) -> Json<Vec<T>> {
    Json(T::collection(&state.store).get_all())
}

fn get_record<T: Stored>(state: &AppState, raw_id: &str) -> Result<Json<T>, ApiError> {
    let id = parse_id(T::KIND, raw_id)?;
    T::collection(&state.store)
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(T::KIND, id))
}

fn create_record<T: Stored + Validated>(
    state: &AppState,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<T>), ApiError> {
    let draft = T::draft(&json_body(payload)?)?;
    let record = T::collection(&state.store).create(draft);
    Ok((StatusCode::CREATED, Json(record)))
}

/// Unknown ids are reported before payload problems.
fn update_record<T: Stored + Validated>(
    state: &AppState,
    raw_id: &str,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<T>, ApiError> {
    let id = parse_id(T::KIND, raw_id)?;
    let collection = T::collection(&state.store);
    if collection.get(id).is_none() {
        return Err(ApiError::not_found(T::KIND, id));
    }
    let patch = T::patch(&json_body(payload)?)?;
    collection
        .update(id, patch)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(T::KIND, id))
}

fn delete_record<T: Stored>(state: &AppState, raw_id: &str) -> Result<StatusCode, ApiError> {
    let id = parse_id(T::KIND, raw_id)?;
    if T::collection(&state.store).delete(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(T::KIND, id))
    }
}

// ============================================================================
// Health & Stats
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok" while the process serves requests.
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/health - Health check endpoint.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

/// GET /api/stats - Dashboard counters.
#[utoipa::path(
    get,
    path = "/api/stats",
    responses((status = 200, description = "Current dashboard counters", body = DashboardStats))
)]
async fn stats(State(state): State<Arc<AppState>>) -> Json<DashboardStats> {
    Json(DashboardStats::collect(&state.store))
}

// ============================================================================
// Shops
// ============================================================================

/// GET /api/shops - List all shops.
#[utoipa::path(
    get,
    path = "/api/shops",
    responses((status = 200, description = "All shops in creation order", body = Vec<Shop>))
)]
async fn list_shops(State(state): State<Arc<AppState>>) -> Json<Vec<Shop>> {
    list_records(&state)
}

/// GET /api/shops/{id} - Get one shop.
#[utoipa::path(
    get,
    path = "/api/shops/{id}",
    params(("id" = u64, Path, description = "Shop ID")),
    responses(
        (status = 200, description = "Shop retrieved", body = Shop),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
async fn get_shop(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Shop>, ApiError> {
    get_record(&state, &id)
}

/// POST /api/shops - Create a shop.
#[utoipa::path(
    post,
    path = "/api/shops",
    request_body = NewShop,
    responses(
        (status = 201, description = "Shop created", body = Shop),
        (status = 400, description = "Invalid payload", body = ErrorBody)
    )
)]
async fn create_shop(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Shop>), ApiError> {
    create_record(&state, payload)
}

/// PATCH /api/shops/{id} - Update some fields of a shop.
#[utoipa::path(
    patch,
    path = "/api/shops/{id}",
    params(("id" = u64, Path, description = "Shop ID")),
    request_body = ShopPatch,
    responses(
        (status = 200, description = "Shop updated", body = Shop),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
async fn update_shop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Shop>, ApiError> {
    update_record(&state, &id, payload)
}

/// DELETE /api/shops/{id} - Delete a shop.
#[utoipa::path(
    delete,
    path = "/api/shops/{id}",
    params(("id" = u64, Path, description = "Shop ID")),
    responses(
        (status = 204, description = "Shop deleted"),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
async fn delete_shop(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    delete_record::<Shop>(&state, &id)
}

// ============================================================================
// Drivers
// ============================================================================

/// GET /api/drivers - List all drivers.
#[utoipa::path(
    get,
    path = "/api/drivers",
    responses((status = 200, description = "All drivers in creation order", body = Vec<Driver>))
)]
async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    list_records(&state)
}

/// GET /api/drivers/{id} - Get one driver.
#[utoipa::path(
    get,
    path = "/api/drivers/{id}",
    params(("id" = u64, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Driver retrieved", body = Driver),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
async fn get_driver(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Driver>, ApiError> {
    get_record(&state, &id)
}

/// POST /api/drivers - Create a driver.
#[utoipa::path(
    post,
    path = "/api/drivers",
    request_body = NewDriver,
    responses(
        (status = 201, description = "Driver created", body = Driver),
        (status = 400, description = "Invalid payload", body = ErrorBody)
    )
)]
async fn create_driver(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Driver>), ApiError> {
    create_record(&state, payload)
}

/// PATCH /api/drivers/{id} - Update some fields of a driver.
#[utoipa::path(
    patch,
    path = "/api/drivers/{id}",
    params(("id" = u64, Path, description = "Driver ID")),
    request_body = DriverPatch,
    responses(
        (status = 200, description = "Driver updated", body = Driver),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
async fn update_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Driver>, ApiError> {
    update_record(&state, &id, payload)
}

/// DELETE /api/drivers/{id} - Delete a driver.
#[utoipa::path(
    delete,
    path = "/api/drivers/{id}",
    params(("id" = u64, Path, description = "Driver ID")),
    responses(
        (status = 204, description = "Driver deleted"),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
async fn delete_driver(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    delete_record::<Driver>(&state, &id)
}

// ============================================================================
// Routes
// ============================================================================

/// GET /api/routes - List all routes.
#[utoipa::path(
    get,
    path = "/api/routes",
    responses((status = 200, description = "All routes in creation order", body = Vec<Route>))
)]
async fn list_routes(State(state): State<Arc<AppState>>) -> Json<Vec<Route>> {
    list_records(&state)
}

/// GET /api/routes/{id} - Get one route.
#[utoipa::path(
    get,
    path = "/api/routes/{id}",
    params(("id" = u64, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Route retrieved", body = Route),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
async fn get_route(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Route>, ApiError> {
    get_record(&state, &id)
}

/// POST /api/routes - Create a route.
#[utoipa::path(
    post,
    path = "/api/routes",
    request_body = NewRoute,
    responses(
        (status = 201, description = "Route created", body = Route),
        (status = 400, description = "Invalid payload", body = ErrorBody)
    )
)]
async fn create_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Route>), ApiError> {
    create_record(&state, payload)
}

/// PATCH /api/routes/{id} - Update some fields of a route.
///
/// Sending `"driverId": null` unassigns the driver.
#[utoipa::path(
    patch,
    path = "/api/routes/{id}",
    params(("id" = u64, Path, description = "Route ID")),
    request_body = RoutePatch,
    responses(
        (status = 200, description = "Route updated", body = Route),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
async fn update_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Route>, ApiError> {
    update_record(&state, &id, payload)
}

/// DELETE /api/routes/{id} - Delete a route.
///
/// Its optimization history is kept.
#[utoipa::path(
    delete,
    path = "/api/routes/{id}",
    params(("id" = u64, Path, description = "Route ID")),
    responses(
        (status = 204, description = "Route deleted"),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
async fn delete_route(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    delete_record::<Route>(&state, &id)
}

/// POST /api/routes/{id}/optimize - Suggest a shorter stop order.
#[utoipa::path(
    post,
    path = "/api/routes/{id}/optimize",
    params(("id" = u64, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Optimization recorded", body = OptimizationRecord),
        (status = 404, description = "Route not found", body = ErrorBody),
        (status = 409, description = "Route is already being optimized", body = ErrorBody),
        (status = 502, description = "Optimization failed", body = ErrorBody)
    )
)]
async fn optimize_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OptimizationRecord>, ApiError> {
    let route_id = parse_id(EntityKind::Route, &id)?;
    let record = state.optimization.optimize(&state.store, route_id).await?;
    Ok(Json(record))
}

/// GET /api/routes/{id}/optimizations - Optimization history of one route.
#[utoipa::path(
    get,
    path = "/api/routes/{id}/optimizations",
    params(("id" = u64, Path, description = "Route ID")),
    responses(
        (status = 200, description = "Entries for this route, oldest first", body = Vec<OptimizationRecord>),
        (status = 404, description = "Route not found", body = ErrorBody)
    )
)]
async fn route_optimizations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OptimizationRecord>>, ApiError> {
    let route_id = parse_id(EntityKind::Route, &id)?;
    if state.store.routes.get(route_id).is_none() {
        return Err(ApiError::not_found(EntityKind::Route, route_id));
    }
    Ok(Json(state.optimization.history_for(route_id)))
}

// ============================================================================
// Targets
// ============================================================================

/// GET /api/targets - List all targets.
#[utoipa::path(
    get,
    path = "/api/targets",
    responses((status = 200, description = "All targets in creation order", body = Vec<Target>))
)]
async fn list_targets(State(state): State<Arc<AppState>>) -> Json<Vec<Target>> {
    list_records(&state)
}

/// GET /api/targets/{id} - Get one target.
#[utoipa::path(
    get,
    path = "/api/targets/{id}",
    params(("id" = u64, Path, description = "Target ID")),
    responses(
        (status = 200, description = "Target retrieved", body = Target),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
async fn get_target(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Target>, ApiError> {
    get_record(&state, &id)
}

/// POST /api/targets - Create a target.
#[utoipa::path(
    post,
    path = "/api/targets",
    request_body = NewTarget,
    responses(
        (status = 201, description = "Target created", body = Target),
        (status = 400, description = "Invalid payload", body = ErrorBody)
    )
)]
async fn create_target(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Target>), ApiError> {
    create_record(&state, payload)
}

/// PATCH /api/targets/{id} - Update some fields of a target.
#[utoipa::path(
    patch,
    path = "/api/targets/{id}",
    params(("id" = u64, Path, description = "Target ID")),
    request_body = TargetPatch,
    responses(
        (status = 200, description = "Target updated", body = Target),
        (status = 400, description = "Invalid payload", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
async fn update_target(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Target>, ApiError> {
    update_record(&state, &id, payload)
}

/// DELETE /api/targets/{id} - Delete a target.
#[utoipa::path(
    delete,
    path = "/api/targets/{id}",
    params(("id" = u64, Path, description = "Target ID")),
    responses(
        (status = 204, description = "Target deleted"),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
async fn delete_target(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    delete_record::<Target>(&state, &id)
}

// ============================================================================
// Optimization History
// ============================================================================

/// Filter for the optimization history.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Only return entries for this route.
    pub route_id: Option<EntityId>,
}

/// GET /api/optimizations - All recorded optimizations, optionally for one route.
#[utoipa::path(
    get,
    path = "/api/optimizations",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Recorded optimizations, oldest first", body = Vec<OptimizationRecord>),
        (status = 400, description = "Invalid routeId", body = ErrorBody)
    )
)]
async fn list_optimizations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<OptimizationRecord>>, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        ApiError::Validation(ValidationErrors {
            errors: vec![FieldError {
                field: "routeId".to_string(),
                message: rejection.body_text(),
            }],
        })
    })?;

    let history = match query.route_id {
        Some(route_id) => state.optimization.history_for(route_id),
        None => state.optimization.history(),
    };
    Ok(Json(history))
}

// ============================================================================
// OpenAPI Documentation
// ============================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        stats,
        list_shops,
        get_shop,
        create_shop,
        update_shop,
        delete_shop,
        list_drivers,
        get_driver,
        create_driver,
        update_driver,
        delete_driver,
        list_routes,
        get_route,
        create_route,
        update_route,
        delete_route,
        optimize_route,
        route_optimizations,
        list_targets,
        get_target,
        create_target,
        update_target,
        delete_target,
        list_optimizations,
    ),
    components(schemas(
        HealthResponse,
        DashboardStats,
        Totals,
        TargetCompletion,
        ErrorBody,
        FieldError,
        Shop,
        NewShop,
        ShopPatch,
        Driver,
        NewDriver,
        DriverPatch,
        DriverStatus,
        Route,
        NewRoute,
        RoutePatch,
        RouteStatus,
        Target,
        NewTarget,
        TargetPatch,
        RouteOptimizationResult,
        OptimizationRecord,
    ))
)]
pub struct ApiDoc;
