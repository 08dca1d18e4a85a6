//! Route optimization service.
//!
//! Runs the [`RouteOptimizer`] collaborator for one route at a time and
//! keeps the history of successful runs.
//!
//! - At most one run per route id is in flight; a concurrent request for the
//!   same route is refused instead of queued. Different routes run in
//!   parallel.
//! - Each run executes on a blocking worker and is bounded by a timeout.
//!   A timed-out worker is not cancelled, but its result is discarded.
//! - Only results that pass [`check_result`] are recorded. Failures are
//!   logged with their cause and never cached.
//!
//! The history is one append-only list. Every entry carries its route id so
//! callers can list everything or filter by route.

use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::console;
use crate::domain::{EntityId, EntityKind, OptimizationRecord, RouteOptimizationResult};
use crate::error::ApiError;
use crate::optimizer::{OptimizationRequest, OptimizerError, RouteOptimizer};
use crate::store::EntityStore;

/// Default optimizer timeout: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Manages optimization runs and their history.
pub struct OptimizationService {
    optimizer: Arc<dyn RouteOptimizer>,
    timeout: Duration,
    console: bool,
    in_flight: Mutex<HashSet<EntityId>>,
    history: RwLock<Vec<OptimizationRecord>>,
}

/// Marks a route as being optimized until dropped.
struct InFlight<'a> {
    routes: &'a Mutex<HashSet<EntityId>>,
    route_id: EntityId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.routes.lock().remove(&self.route_id);
    }
}

impl OptimizationService {
    /// Creates a service with the default timeout and console output off.
    pub fn new(optimizer: Arc<dyn RouteOptimizer>) -> Self {
        Self {
            optimizer,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            console: false,
            in_flight: Mutex::new(HashSet::new()),
            history: RwLock::new(Vec::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables the colored run summaries on stdout.
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    /// All recorded runs, oldest first.
    pub fn history(&self) -> Vec<OptimizationRecord> {
        self.history.read().clone()
    }

    /// Recorded runs for one route, oldest first.
    pub fn history_for(&self, route_id: EntityId) -> Vec<OptimizationRecord> {
        self.history
            .read()
            .iter()
            .filter(|r| r.route_id == route_id)
            .cloned()
            .collect()
    }

    pub fn is_running(&self, route_id: EntityId) -> bool {
        self.in_flight.lock().contains(&route_id)
    }

    fn begin(&self, route_id: EntityId) -> Result<InFlight<'_>, ApiError> {
        if !self.in_flight.lock().insert(route_id) {
            return Err(ApiError::OptimizationInProgress(route_id));
        }
        Ok(InFlight {
            routes: &self.in_flight,
            route_id,
        })
    }

    /// Optimizes the route with `route_id` and records the result.
    pub async fn optimize(&self, store: &EntityStore, route_id: EntityId) -> Result<OptimizationRecord, ApiError> {
        let route = store
            .routes
            .get(route_id)
            .ok_or_else(|| ApiError::not_found(EntityKind::Route, route_id))?;

        let _guard = self.begin(route_id)?;
        let start = Instant::now();

        let mut stops = Vec::with_capacity(route.shop_ids.len());
        let mut missing = Vec::new();
        for &shop_id in &route.shop_ids {
            match store.shops.get(shop_id) {
                Some(shop) => stops.push(shop),
                None => missing.push(shop_id),
            }
        }
        let driver = route.driver_id.and_then(|id| store.drivers.get(id));
        let route_name = route.name.clone();
        let shop_ids = route.shop_ids.clone();

        info!(
            route_id,
            stops = stops.len(),
            missing = missing.len(),
            "Starting route optimization"
        );

        let request = OptimizationRequest {
            route,
            stops,
            missing,
            driver,
        };

        let outcome = self
            .run(request)
            .await
            .and_then(|result| check_result(&shop_ids, result));

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(route_id, error = %e, "Route optimization failed");
                if self.console {
                    console::print_optimization_failed(route_id, start.elapsed());
                }
                return Err(ApiError::OptimizationFailed(e));
            }
        };

        let record = OptimizationRecord {
            id: Uuid::new_v4(),
            route_id,
            created_at: Utc::now(),
            result,
        };
        self.history.write().push(record.clone());

        info!(
            route_id,
            run_id = %record.id,
            original_km = record.result.original_distance,
            optimized_km = record.result.optimized_distance,
            "Route optimization complete"
        );
        if self.console {
            console::print_optimization_ended(&route_name, &record, start.elapsed());
        }

        Ok(record)
    }

    /// Runs the optimizer on a blocking worker under the timeout.
    async fn run(&self, request: OptimizationRequest) -> Result<RouteOptimizationResult, OptimizerError> {
        let optimizer = self.optimizer.clone();
        let task = tokio::task::spawn_blocking(move || optimizer.optimize(&request));

        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => Err(OptimizerError::TimedOut(self.timeout)),
            Ok(Err(join_error)) => Err(OptimizerError::Aborted(join_error.to_string())),
            Ok(Ok(result)) => result,
        }
    }
}

/// Rejects results that would corrupt the history.
///
/// The order must be a permutation of the route's shop ids and every
/// figure must be a finite, non-negative number.
///
/// ```
/// use logistics_dashboard::domain::RouteOptimizationResult;
/// use logistics_dashboard::optimization::check_result;
///
/// let result = RouteOptimizationResult {
///     optimized_order: vec![3, 1, 2],
///     original_distance: 12.0,
///     optimized_distance: 9.5,
///     time_saved: 3.75,
///     fuel_saved: 0.3,
///     suggestions: vec![],
/// };
/// assert!(check_result(&[1, 2, 3], result.clone()).is_ok());
/// assert!(check_result(&[1, 2], result).is_err());
/// ```
pub fn check_result(
    shop_ids: &[EntityId],
    result: RouteOptimizationResult,
) -> Result<RouteOptimizationResult, OptimizerError> {
    let mut expected = shop_ids.to_vec();
    let mut actual = result.optimized_order.clone();
    expected.sort_unstable();
    actual.sort_unstable();
    if expected != actual {
        return Err(OptimizerError::InvalidResult(
            "optimized order is not a permutation of the route's shops".to_string(),
        ));
    }

    let figures = [
        ("originalDistance", result.original_distance),
        ("optimizedDistance", result.optimized_distance),
        ("timeSaved", result.time_saved),
        ("fuelSaved", result.fuel_saved),
    ];
    for (name, value) in figures {
        if !value.is_finite() || value < 0.0 {
            return Err(OptimizerError::InvalidResult(format!(
                "{name} must be a finite non-negative number, got {value}"
            )));
        }
    }

    Ok(result)
}
