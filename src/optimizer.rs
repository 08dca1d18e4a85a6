//! Route optimizer collaborator.
//!
//! [`RouteOptimizer`] is the seam between the service and whatever computes
//! a better visiting order. The service hands it an [`OptimizationRequest`]
//! (the route plus its resolved shops) and expects a
//! [`RouteOptimizationResult`] back.
//!
//! [`NearestNeighbourOptimizer`] is the built-in implementation:
//! 1. Construction: nearest-neighbour tour starting at the route's first shop
//! 2. Local search: 2-opt segment reversal until no move improves the path
//!
//! Paths are open (no return to the first shop) and distances are haversine
//! kilometres. If the improved path does not save at least 0.01 km after
//! rounding, the original order is kept, so reported savings are never
//! negative. Routes longer than [`MAX_ROUTE_STOPS`] are refused.

use std::time::Duration;

use tracing::debug;

use crate::domain::{Driver, EntityId, Route, RouteOptimizationResult, Shop, MAX_ROUTE_STOPS};

/// Default average driving speed in km/h used to convert distance into time.
pub const DEFAULT_AVERAGE_SPEED_KMPH: f64 = 40.0;

/// Default fuel consumption in litres per 100 km.
pub const DEFAULT_FUEL_L_PER_100KM: f64 = 12.0;

/// Upper bound on 2-opt improvement passes.
const MAX_LOCAL_SEARCH_PASSES: usize = 1_000;

/// Improvements smaller than this (km) are treated as noise.
const EPSILON_KM: f64 = 1e-9;

/// Smallest saving (km) that survives rounding to two decimals. A shorter
/// reorder is discarded and the original order kept.
const MIN_SAVING_KM: f64 = 0.005;

/// Errors reported by an optimization run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptimizerError {
    /// The optimizer itself reported a failure.
    #[error("optimizer failed: {0}")]
    Failed(String),

    /// The optimizer did not answer in time.
    #[error("optimizer timed out after {0:?}")]
    TimedOut(Duration),

    /// The optimizer answered with something that cannot be cached.
    #[error("optimizer returned an invalid result: {0}")]
    InvalidResult(String),

    /// The optimizer task panicked or was cancelled.
    #[error("optimizer task aborted: {0}")]
    Aborted(String),
}

/// Everything an optimizer needs to know about one route.
#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    pub route: Route,
    /// Shops that exist, in the route's current order.
    pub stops: Vec<Shop>,
    /// Shop ids on the route that no longer resolve to a shop.
    pub missing: Vec<EntityId>,
    /// The assigned driver, if the route has one and it still exists.
    pub driver: Option<Driver>,
}

/// Computes an optimized visiting order for a route.
///
/// Implementations run on a blocking worker thread, so they may do heavy
/// computation or synchronous I/O.
pub trait RouteOptimizer: Send + Sync {
    fn optimize(&self, request: &OptimizationRequest) -> Result<RouteOptimizationResult, OptimizerError>;
}

/// Nearest-neighbour construction followed by 2-opt improvement.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use logistics_dashboard::domain::{Entity, NewRoute, NewShop, Route, Shop};
/// use logistics_dashboard::optimizer::{NearestNeighbourOptimizer, OptimizationRequest, RouteOptimizer};
///
/// let date = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
/// // West, far east, middle: visiting in this order zig-zags
/// let stops = vec![
///     Shop::from_draft(1, NewShop::new("West", -1.28, 36.70)),
///     Shop::from_draft(2, NewShop::new("East", -1.28, 36.90)),
///     Shop::from_draft(3, NewShop::new("Middle", -1.28, 36.80)),
/// ];
/// let route = Route::from_draft(4, NewRoute::new("Zig-zag", date).with_shops(vec![1, 2, 3]));
///
/// let request = OptimizationRequest { route, stops, missing: vec![], driver: None };
/// let result = NearestNeighbourOptimizer::default().optimize(&request).unwrap();
///
/// assert_eq!(result.optimized_order, vec![1, 3, 2]);
/// assert!(result.optimized_distance < result.original_distance);
/// assert!(result.time_saved > 0.0 && result.fuel_saved > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct NearestNeighbourOptimizer {
    /// Average speed in km/h for the time estimate.
    pub average_speed_kmph: f64,
    /// Fuel consumption in litres per 100 km.
    pub fuel_l_per_100km: f64,
}

impl Default for NearestNeighbourOptimizer {
    fn default() -> Self {
        Self {
            average_speed_kmph: DEFAULT_AVERAGE_SPEED_KMPH,
            fuel_l_per_100km: DEFAULT_FUEL_L_PER_100KM,
        }
    }
}

impl NearestNeighbourOptimizer {
    pub fn new(average_speed_kmph: f64, fuel_l_per_100km: f64) -> Self {
        Self {
            average_speed_kmph,
            fuel_l_per_100km,
        }
    }
}

impl RouteOptimizer for NearestNeighbourOptimizer {
    fn optimize(&self, request: &OptimizationRequest) -> Result<RouteOptimizationResult, OptimizerError> {
        if self.average_speed_kmph <= 0.0 || !self.average_speed_kmph.is_finite() {
            return Err(OptimizerError::Failed(format!(
                "average speed must be positive, got {}",
                self.average_speed_kmph
            )));
        }
        let stop_count = request.stops.len() + request.missing.len();
        if stop_count > MAX_ROUTE_STOPS {
            return Err(OptimizerError::Failed(format!(
                "route has {stop_count} stops, at most {MAX_ROUTE_STOPS} are supported"
            )));
        }

        let matrix = distance_matrix(&request.stops);
        let identity: Vec<usize> = (0..request.stops.len()).collect();
        let original_distance = path_length(&identity, &matrix);

        let mut order = nearest_neighbour(&matrix);
        let passes = two_opt(&mut order, &matrix);
        let mut optimized_distance = path_length(&order, &matrix);

        if original_distance - optimized_distance < MIN_SAVING_KM {
            order = identity;
            optimized_distance = original_distance;
        }

        debug!(
            route_id = request.route.id,
            stops = request.stops.len(),
            passes,
            original_km = original_distance,
            optimized_km = optimized_distance,
            "Route optimized"
        );

        let saved_km = (original_distance - optimized_distance).max(0.0);
        let time_saved = saved_km / self.average_speed_kmph * 60.0;
        let fuel_saved = saved_km * self.fuel_l_per_100km / 100.0;

        let mut optimized_order: Vec<EntityId> = order.iter().map(|&i| request.stops[i].id).collect();
        optimized_order.extend(request.missing.iter().copied());

        Ok(RouteOptimizationResult {
            optimized_order,
            original_distance: round2(original_distance),
            optimized_distance: round2(optimized_distance),
            time_saved: round2(time_saved),
            fuel_saved: round2(fuel_saved),
            suggestions: suggestions(request, saved_km, time_saved, fuel_saved),
        })
    }
}

/// Pairwise haversine distances between stops.
fn distance_matrix(stops: &[Shop]) -> Vec<Vec<f64>> {
    stops
        .iter()
        .map(|from| {
            let from = from.location();
            stops.iter().map(|to| from.distance_km(&to.location())).collect()
        })
        .collect()
}

/// Length of an open path visiting `order` in sequence.
fn path_length(order: &[usize], matrix: &[Vec<f64>]) -> f64 {
    order.windows(2).map(|pair| matrix[pair[0]][pair[1]]).sum()
}

/// Greedy tour: always drive to the closest stop not yet visited.
///
/// Starts at stop 0 so the route keeps its first shop. Ties go to the stop
/// listed first.
fn nearest_neighbour(matrix: &[Vec<f64>]) -> Vec<usize> {
    let n = matrix.len();
    if n == 0 {
        return Vec::new();
    }

    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut current = 0;
    visited[0] = true;
    order.push(0);

    while order.len() < n {
        let next = (0..n)
            .filter(|&j| !visited[j])
            .min_by(|&a, &b| matrix[current][a].total_cmp(&matrix[current][b]));
        let Some(next) = next else { break };
        visited[next] = true;
        order.push(next);
        current = next;
    }

    order
}

/// 2-opt on an open path with a fixed first stop.
///
/// Reverses `order[i..=j]` whenever that shortens the path, until a full
/// pass finds nothing. Returns the number of passes made.
fn two_opt(order: &mut [usize], matrix: &[Vec<f64>]) -> usize {
    let n = order.len();
    if n < 3 {
        return 0;
    }

    let mut passes = 0;
    loop {
        passes += 1;
        let mut improved = false;

        for i in 1..n - 1 {
            for j in i + 1..n {
                let before = order[i - 1];
                let first = order[i];
                let last = order[j];

                let mut delta = matrix[before][last] - matrix[before][first];
                if let Some(&after) = order.get(j + 1) {
                    delta += matrix[first][after] - matrix[last][after];
                }

                if delta < -EPSILON_KM {
                    order[i..=j].reverse();
                    improved = true;
                }
            }
        }

        if !improved || passes >= MAX_LOCAL_SEARCH_PASSES {
            return passes;
        }
    }
}

fn suggestions(request: &OptimizationRequest, saved_km: f64, time_saved: f64, fuel_saved: f64) -> Vec<String> {
    let mut out = Vec::new();

    if request.stops.len() < 2 {
        out.push("Add at least two existing shops to this route to optimize it".to_string());
    } else if saved_km > 0.0 {
        out.push(format!(
            "Reorder stops to save {saved_km:.2} km (about {time_saved:.0} min and {fuel_saved:.2} L of fuel)"
        ));
    } else {
        out.push("Current stop order is already the shortest found".to_string());
    }

    if !request.missing.is_empty() {
        let ids: Vec<String> = request.missing.iter().map(ToString::to_string).collect();
        out.push(format!(
            "Remove shop ids {} from this route; they no longer exist",
            ids.join(", ")
        ));
    }

    for shop in request.stops.iter().filter(|s| !s.is_active()) {
        out.push(format!(
            "Shop \"{}\" is {}; consider dropping it from this route",
            shop.name, shop.status
        ));
    }

    if request.driver.is_none() {
        out.push("Assign a driver before dispatching this route".to_string());
    }

    out
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Entity, NewDriver, NewRoute, NewShop};
    use chrono::NaiveDate;

    fn shop(id: EntityId, lat: f64, lon: f64) -> Shop {
        Shop::from_draft(id, NewShop::new(format!("Shop {id}"), lat, lon))
    }

    fn request(stops: Vec<Shop>, missing: Vec<EntityId>) -> OptimizationRequest {
        let mut shop_ids: Vec<EntityId> = stops.iter().map(|s| s.id).collect();
        shop_ids.extend(missing.iter().copied());
        let date = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        OptimizationRequest {
            route: Route::from_draft(100, NewRoute::new("Test", date).with_shops(shop_ids)),
            stops,
            missing,
            driver: Some(Driver::from_draft(
                200,
                NewDriver::new("Kamau", "+254700000000", "van"),
            )),
        }
    }

    #[test]
    fn test_already_optimal_keeps_order() {
        let stops = vec![shop(1, 0.0, 0.0), shop(2, 0.0, 0.1), shop(3, 0.0, 0.2)];
        let result = NearestNeighbourOptimizer::default()
            .optimize(&request(stops, vec![]))
            .unwrap();

        assert_eq!(result.optimized_order, vec![1, 2, 3]);
        assert_eq!(result.original_distance, result.optimized_distance);
        assert_eq!(result.time_saved, 0.0);
        assert_eq!(result.fuel_saved, 0.0);
        assert!(result.suggestions[0].contains("already the shortest"));
    }

    #[test]
    fn test_saving_below_rounding_keeps_order() {
        // Shop 3 sits between 1 and 2, about a metre apart
        let stops = vec![shop(1, 0.0, 0.0), shop(2, 0.0, 0.00002), shop(3, 0.0, 0.00001)];
        let result = NearestNeighbourOptimizer::default()
            .optimize(&request(stops, vec![]))
            .unwrap();

        assert_eq!(result.optimized_order, vec![1, 2, 3]);
        assert_eq!(result.time_saved, 0.0);
        assert!(result.suggestions[0].contains("already the shortest"));
        assert!(!result.suggestions.iter().any(|s| s.contains("0.00 km")));
    }

    #[test]
    fn test_untangles_crossing_path() {
        // A square visited corner-to-opposite-corner crosses itself
        let stops = vec![
            shop(1, 0.0, 0.0),
            shop(2, 0.1, 0.1),
            shop(3, 0.0, 0.1),
            shop(4, 0.1, 0.0),
        ];
        let result = NearestNeighbourOptimizer::default()
            .optimize(&request(stops, vec![]))
            .unwrap();

        assert!(result.optimized_distance < result.original_distance);
        assert!(result.time_saved > 0.0);
        assert_eq!(result.optimized_order[0], 1);
        let mut sorted = result.optimized_order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_missing_shops_appended() {
        let stops = vec![shop(1, 0.0, 0.0), shop(2, 0.0, 0.1)];
        let result = NearestNeighbourOptimizer::default()
            .optimize(&request(stops, vec![9, 8]))
            .unwrap();

        assert_eq!(result.optimized_order, vec![1, 2, 9, 8]);
        assert!(result.suggestions.iter().any(|s| s.contains("9, 8")));
    }

    #[test]
    fn test_too_few_stops() {
        let result = NearestNeighbourOptimizer::default()
            .optimize(&request(vec![shop(1, 0.0, 0.0)], vec![]))
            .unwrap();
        assert_eq!(result.optimized_order, vec![1]);
        assert_eq!(result.original_distance, 0.0);
        assert!(result.suggestions[0].contains("at least two"));

        let result = NearestNeighbourOptimizer::default()
            .optimize(&request(vec![], vec![]))
            .unwrap();
        assert!(result.optimized_order.is_empty());
    }

    #[test]
    fn test_suggests_driver_and_inactive_shop() {
        let closed = Shop::from_draft(2, NewShop::new("Closed Duka", 0.0, 0.1).with_status("inactive"));
        let mut req = request(vec![shop(1, 0.0, 0.0), closed], vec![]);
        req.driver = None;

        let result = NearestNeighbourOptimizer::default().optimize(&req).unwrap();
        assert!(result.suggestions.iter().any(|s| s.contains("Closed Duka")));
        assert!(result.suggestions.iter().any(|s| s.contains("Assign a driver")));
    }

    #[test]
    fn test_savings_conversion() {
        let optimizer = NearestNeighbourOptimizer::new(60.0, 10.0);
        let stops = vec![shop(1, 0.0, 0.0), shop(2, 0.0, 0.2), shop(3, 0.0, 0.1)];
        let result = optimizer.optimize(&request(stops, vec![])).unwrap();

        let saved = result.original_distance - result.optimized_distance;
        // 60 km/h: one minute per km; 10 L/100km: 0.1 L per km
        assert!((result.time_saved - saved).abs() < 0.02);
        assert!((result.fuel_saved - saved * 0.1).abs() < 0.02);
    }

    #[test]
    fn test_rejects_bad_speed() {
        let optimizer = NearestNeighbourOptimizer::new(0.0, 10.0);
        let err = optimizer.optimize(&request(vec![], vec![])).unwrap_err();
        assert!(matches!(err, OptimizerError::Failed(_)));
    }

    #[test]
    fn test_rejects_oversized_route() {
        let stops: Vec<Shop> = (1..=MAX_ROUTE_STOPS as EntityId)
            .map(|id| shop(id, 0.0, id as f64 * 0.001))
            .collect();
        let optimizer = NearestNeighbourOptimizer::default();
        assert!(optimizer.optimize(&request(stops.clone(), vec![])).is_ok());

        let err = optimizer.optimize(&request(stops, vec![999])).unwrap_err();
        assert!(matches!(err, OptimizerError::Failed(_)));
    }
}
