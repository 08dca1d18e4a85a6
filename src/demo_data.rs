//! Demo dataset for a fresh dashboard.
//!
//! Seeds a small Nairobi distribution network:
//! - 16 shops around the CBD, Westlands, Eastleigh and Industrial Area
//! - 4 drivers on motorbikes, vans and a pickup
//! - 3 routes for today, each visiting shops in a shuffled order
//! - a weekly target per driver
//!
//! Everything goes through the normal `create` path, so seeded records get
//! ordinary ids. The random choices use a fixed seed; only the dates follow
//! the current day.

use chrono::{Days, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::domain::{DriverStatus, EntityId, NewDriver, NewRoute, NewShop, NewTarget, RouteStatus};
use crate::store::EntityStore;

const SEED: u64 = 254;

/// Shop data with name, coordinates and category.
struct ShopData {
    name: &'static str,
    lat: f64,
    lng: f64,
    category: &'static str,
}

const NAIROBI_SHOPS: &[ShopData] = &[
    // CBD
    ShopData { name: "Tom Mboya Street Minimart", lat: -1.2833, lng: 36.8260, category: "retail" },
    ShopData { name: "Moi Avenue Chemist", lat: -1.2841, lng: 36.8235, category: "pharmacy" },
    ShopData { name: "River Road Wholesalers", lat: -1.2820, lng: 36.8290, category: "wholesale" },
    ShopData { name: "Kenyatta Avenue Supermarket", lat: -1.2864, lng: 36.8172, category: "supermarket" },
    // Westlands
    ShopData { name: "Sarit Corner Duka", lat: -1.2610, lng: 36.8025, category: "retail" },
    ShopData { name: "Westlands Mall Pharmacy", lat: -1.2676, lng: 36.8108, category: "pharmacy" },
    ShopData { name: "Parklands Fresh Mart", lat: -1.2635, lng: 36.8160, category: "supermarket" },
    ShopData { name: "Mpaka Road Kiosk", lat: -1.2650, lng: 36.8060, category: "retail" },
    // Eastleigh
    ShopData { name: "First Avenue Traders", lat: -1.2741, lng: 36.8447, category: "wholesale" },
    ShopData { name: "Eastleigh General Store", lat: -1.2765, lng: 36.8490, category: "retail" },
    ShopData { name: "Juja Road Mini Market", lat: -1.2702, lng: 36.8530, category: "retail" },
    ShopData { name: "Section Three Chemist", lat: -1.2790, lng: 36.8515, category: "pharmacy" },
    // Industrial Area and South
    ShopData { name: "Enterprise Road Depot Shop", lat: -1.3080, lng: 36.8520, category: "wholesale" },
    ShopData { name: "South B Supermarket", lat: -1.3095, lng: 36.8350, category: "supermarket" },
    ShopData { name: "Mombasa Road Kiosk", lat: -1.3190, lng: 36.8420, category: "retail" },
    ShopData { name: "Lunga Lunga Traders", lat: -1.3040, lng: 36.8610, category: "wholesale" },
];

/// Driver data with name, phone and vehicle type.
struct DriverData {
    name: &'static str,
    phone: &'static str,
    vehicle_type: &'static str,
}

const DRIVERS: &[DriverData] = &[
    DriverData { name: "Wanjiru Kamau", phone: "+254712345601", vehicle_type: "van" },
    DriverData { name: "Otieno Odhiambo", phone: "+254712345602", vehicle_type: "motorbike" },
    DriverData { name: "Achieng Atieno", phone: "+254712345603", vehicle_type: "pickup" },
    DriverData { name: "Kiprono Kiptoo", phone: "+254712345604", vehicle_type: "motorbike" },
];

const ROUTE_NAMES: [&str; 3] = ["CBD Morning Run", "Westlands Loop", "Eastlands Restock"];

/// Shop index that starts out inactive.
const INACTIVE_SHOP: usize = 10;

/// Counts of the records inserted by [`seed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoSummary {
    pub shops: usize,
    pub drivers: usize,
    pub routes: usize,
    pub targets: usize,
}

/// Inserts the demo dataset into `store`.
///
/// # Examples
///
/// ```
/// use logistics_dashboard::demo_data::seed;
/// use logistics_dashboard::store::EntityStore;
///
/// let store = EntityStore::new();
/// let summary = seed(&store);
/// assert_eq!(summary.shops, 16);
/// assert_eq!(store.drivers.len(), summary.drivers);
/// ```
pub fn seed(store: &EntityStore) -> DemoSummary {
    seed_for(store, Utc::now().date_naive())
}

fn seed_for(store: &EntityStore, today: NaiveDate) -> DemoSummary {
    let mut rng = StdRng::seed_from_u64(SEED);

    let shop_ids: Vec<EntityId> = NAIROBI_SHOPS
        .iter()
        .enumerate()
        .map(|(i, data)| {
            let mut draft = NewShop::new(data.name, data.lat, data.lng).with_category(data.category);
            if i == INACTIVE_SHOP {
                draft = draft.with_status("inactive");
            }
            store.shops.create(draft).id
        })
        .collect();

    let driver_ids: Vec<EntityId> = DRIVERS
        .iter()
        .enumerate()
        .map(|(i, data)| {
            let status = if i == DRIVERS.len() - 1 {
                DriverStatus::OffDuty
            } else {
                DriverStatus::Available
            };
            let draft = NewDriver::new(data.name, data.phone, data.vehicle_type).with_status(status);
            store.drivers.create(draft).id
        })
        .collect();

    // Each route takes a contiguous area block of four shops, then shuffles it
    for (i, name) in ROUTE_NAMES.iter().enumerate() {
        let mut stops: Vec<EntityId> = shop_ids.iter().skip(i * 4).take(4).copied().collect();
        if i == 0 {
            stops.extend(shop_ids.iter().skip(12).take(2).copied());
        }
        for j in (1..stops.len()).rev() {
            let k = rng.gen_range(0..=j);
            stops.swap(j, k);
        }

        let mut draft = NewRoute::new(*name, today).with_shops(stops);
        // The last route is left unassigned
        if let Some(&driver_id) = driver_ids.get(i).filter(|_| i + 1 < ROUTE_NAMES.len()) {
            draft = draft.with_driver(driver_id);
        }
        if i == 0 {
            draft = draft.with_status(RouteStatus::InProgress);
        }
        store.routes.create(draft);
    }

    let week_end = today + Days::new(6);
    for &driver_id in &driver_ids {
        let target_shops = rng.gen_range(20..=40);
        let target_deliveries = rng.gen_range(80..=150);
        let mut draft = NewTarget::new(driver_id, "weekly", target_shops, target_deliveries, today, week_end);
        draft.completed_shops = rng.gen_range(0..=target_shops);
        draft.completed_deliveries = rng.gen_range(0..=target_deliveries);
        store.targets.create(draft);
    }

    let summary = DemoSummary {
        shops: shop_ids.len(),
        drivers: driver_ids.len(),
        routes: ROUTE_NAMES.len(),
        targets: driver_ids.len(),
    };
    info!(
        shops = summary.shops,
        drivers = summary.drivers,
        routes = summary.routes,
        targets = summary.targets,
        "Seeded demo data"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 18).unwrap()
    }

    #[test]
    fn test_seed_counts_match_store() {
        let store = EntityStore::new();
        let summary = seed_for(&store, day());
        assert_eq!(store.shops.len(), summary.shops);
        assert_eq!(store.drivers.len(), summary.drivers);
        assert_eq!(store.routes.len(), summary.routes);
        assert_eq!(store.targets.len(), summary.targets);
    }

    #[test]
    fn test_routes_reference_seeded_shops() {
        let store = EntityStore::new();
        seed_for(&store, day());
        for route in store.routes.get_all() {
            assert!(!route.shop_ids.is_empty());
            assert!(route.shop_ids.iter().all(|&id| store.shops.get(id).is_some()));
            assert_eq!(route.date, day());
        }
        let unassigned = store.routes.get_all().iter().filter(|r| r.driver_id.is_none()).count();
        assert_eq!(unassigned, 1);
    }

    #[test]
    fn test_seed_is_deterministic() {
        let a = EntityStore::new();
        let b = EntityStore::new();
        seed_for(&a, day());
        seed_for(&b, day());
        assert_eq!(a.routes.get_all(), b.routes.get_all());
        assert_eq!(a.targets.get_all(), b.targets.get_all());
    }

    #[test]
    fn test_targets_within_bounds() {
        let store = EntityStore::new();
        seed_for(&store, day());
        for target in store.targets.get_all() {
            assert!(target.completed_shops <= target.target_shops);
            assert!(target.completed_deliveries <= target.target_deliveries);
            assert_eq!(target.end_date, day() + Days::new(6));
        }
    }
}
