//! Dashboard counters computed from the entity store.

use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::domain::{progress, DriverStatus, RouteStatus};
use crate::store::EntityStore;

/// Record count per entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Totals {
    pub shops: usize,
    pub drivers: usize,
    pub routes: usize,
    pub targets: usize,
}

/// Progress summed over every target, as percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct TargetCompletion {
    pub shops: f64,
    pub deliveries: f64,
}

/// Snapshot of the dashboard's headline numbers.
///
/// Status maps list every known status, including those with no records.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub totals: Totals,
    pub active_shops: usize,
    pub drivers_by_status: BTreeMap<String, usize>,
    pub routes_by_status: BTreeMap<String, usize>,
    pub target_completion: TargetCompletion,
}

impl DashboardStats {
    pub fn collect(store: &EntityStore) -> Self {
        let shops = store.shops.get_all();
        let drivers = store.drivers.get_all();
        let routes = store.routes.get_all();
        let targets = store.targets.get_all();

        let mut drivers_by_status: BTreeMap<String, usize> =
            DriverStatus::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect();
        for driver in &drivers {
            *drivers_by_status.entry(driver.status.as_str().to_string()).or_default() += 1;
        }

        let mut routes_by_status: BTreeMap<String, usize> =
            RouteStatus::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect();
        for route in &routes {
            *routes_by_status.entry(route.status.as_str().to_string()).or_default() += 1;
        }

        let (mut done_shops, mut goal_shops, mut done_deliveries, mut goal_deliveries) = (0u64, 0u64, 0u64, 0u64);
        for target in &targets {
            done_shops += u64::from(target.completed_shops);
            goal_shops += u64::from(target.target_shops);
            done_deliveries += u64::from(target.completed_deliveries);
            goal_deliveries += u64::from(target.target_deliveries);
        }

        Self {
            totals: Totals {
                shops: shops.len(),
                drivers: drivers.len(),
                routes: routes.len(),
                targets: targets.len(),
            },
            active_shops: shops.iter().filter(|s| s.is_active()).count(),
            drivers_by_status,
            routes_by_status,
            target_completion: TargetCompletion {
                shops: round1(progress(done_shops, goal_shops)),
                deliveries: round1(progress(done_deliveries, goal_deliveries)),
            },
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewDriver, NewShop, NewTarget};
    use chrono::NaiveDate;

    #[test]
    fn test_empty_store() {
        let stats = DashboardStats::collect(&EntityStore::new());
        assert_eq!(stats.totals.shops, 0);
        assert_eq!(stats.drivers_by_status["available"], 0);
        assert_eq!(stats.routes_by_status.len(), 3);
        assert_eq!(stats.target_completion.deliveries, 100.0);
    }

    #[test]
    fn test_counts_and_completion() {
        let store = EntityStore::new();
        store.shops.create(NewShop::new("A", -1.28, 36.82));
        store.shops.create(NewShop::new("B", -1.27, 36.81).with_status("closed"));
        store
            .drivers
            .create(NewDriver::new("Wanjiru", "+254700000001", "van").with_status(DriverStatus::OnRoute));

        let start = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 2, 22).unwrap();
        let mut a = NewTarget::new(1, "weekly", 10, 100, start, end);
        a.completed_deliveries = 30;
        let mut b = NewTarget::new(1, "weekly", 10, 200, start, end);
        b.completed_deliveries = 60;
        b.completed_shops = 5;
        store.targets.create(a);
        store.targets.create(b);

        let stats = DashboardStats::collect(&store);
        assert_eq!(stats.totals.shops, 2);
        assert_eq!(stats.active_shops, 1);
        assert_eq!(stats.drivers_by_status["on_route"], 1);
        assert_eq!(stats.target_completion.deliveries, 30.0);
        assert_eq!(stats.target_completion.shops, 25.0);
    }
}
