//! Domain model for the logistics dashboard.
//!
//! # Overview
//!
//! Four stored entity kinds:
//! - [`Shop`]s: delivery points with a geographic position
//! - [`Driver`]s: people who drive routes
//! - [`Route`]s: an ordered list of shops for one day, optionally assigned to a driver
//! - [`Target`]s: per-driver performance goals over a period
//!
//! Each kind comes with a draft type (validated input for creation, defaults
//! already applied) and a patch type (partial update, every field optional).
//! The [`Entity`] trait ties the three together for the store.
//!
//! [`RouteOptimizationResult`] is transient: it is produced by the optimizer
//! and kept in the optimization history, never in the entity store.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Identifier shared by every entity kind.
pub type EntityId = u64;

/// Earth radius in kilometres for haversine calculation.
const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Default shop category.
pub const DEFAULT_SHOP_CATEGORY: &str = "retail";

/// Default shop status.
pub const DEFAULT_SHOP_STATUS: &str = "active";

/// Most stops a route may list. Optimization builds a stop-by-stop distance
/// matrix, so this bounds its size.
pub const MAX_ROUTE_STOPS: usize = 200;

// ============================================================================
// Entity kinds
// ============================================================================

/// The four kinds of records held by the entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Shop,
    Driver,
    Route,
    Target,
}

impl EntityKind {
    /// Lowercase name used in messages and logs.
    ///
    /// ```
    /// use logistics_dashboard::domain::EntityKind;
    ///
    /// assert_eq!(EntityKind::Shop.as_str(), "shop");
    /// assert_eq!(EntityKind::Target.to_string(), "target");
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Shop => "shop",
            EntityKind::Driver => "driver",
            EntityKind::Route => "route",
            EntityKind::Target => "target",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored record with immutable identity and mutable fields.
///
/// `Draft` is the validated creation input with defaults applied; `Patch`
/// holds only the fields a partial update touches.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Kind tag used for errors and logging.
    const KIND: EntityKind;

    type Draft;
    type Patch;

    fn id(&self) -> EntityId;

    /// Builds the full record from a draft and a freshly issued id.
    fn from_draft(id: EntityId, draft: Self::Draft) -> Self;

    /// Merges the fields present in `patch`; absent fields stay untouched.
    fn apply(&mut self, patch: Self::Patch);
}

// ============================================================================
// Location
// ============================================================================

/// A geographic position in degrees.
///
/// # Examples
///
/// ```
/// use logistics_dashboard::domain::Location;
///
/// let nairobi_cbd = Location::new(-1.2864, 36.8172);
/// let westlands = Location::new(-1.2676, 36.8108);
///
/// // Roughly 2 km apart
/// let km = nairobi_cbd.distance_km(&westlands);
/// assert!(km > 1.5 && km < 2.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in kilometres using the haversine formula.
    ///
    /// ```
    /// use logistics_dashboard::domain::Location;
    ///
    /// let a = Location::new(0.0, 0.0);
    /// let b = Location::new(0.0, 1.0);
    ///
    /// // 1 degree of longitude at the equator is about 111 km
    /// let km = a.distance_km(&b);
    /// assert!(km > 110.0 && km < 112.0);
    /// assert_eq!(a.distance_km(&a), 0.0);
    /// ```
    pub fn distance_km(&self, other: &Location) -> f64 {
        if self.latitude == other.latitude && self.longitude == other.longitude {
            return 0.0;
        }

        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }
}

// ============================================================================
// Shop
// ============================================================================

/// A delivery point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: EntityId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Free-form category, `retail` unless given.
    pub category: String,
    /// Free-form status, `active` unless given.
    pub status: String,
}

impl Shop {
    pub fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude)
    }

    pub fn is_active(&self) -> bool {
        self.status == DEFAULT_SHOP_STATUS
    }
}

/// Creation input for a [`Shop`].
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewShop {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[schema(default = "retail")]
    pub category: String,
    #[schema(default = "active")]
    pub status: String,
}

impl NewShop {
    /// Creates a draft with the default category and status.
    ///
    /// ```
    /// use logistics_dashboard::domain::NewShop;
    ///
    /// let draft = NewShop::new("Mama Njeri Kiosk", -1.26, 36.86);
    /// assert_eq!(draft.category, "retail");
    /// assert_eq!(draft.status, "active");
    /// ```
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            category: DEFAULT_SHOP_CATEGORY.to_string(),
            status: DEFAULT_SHOP_STATUS.to_string(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

/// Partial update for a [`Shop`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShopPatch {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub category: Option<String>,
    pub status: Option<String>,
}

impl Entity for Shop {
    const KIND: EntityKind = EntityKind::Shop;
    type Draft = NewShop;
    type Patch = ShopPatch;

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_draft(id: EntityId, draft: NewShop) -> Self {
        Self {
            id,
            name: draft.name,
            latitude: draft.latitude,
            longitude: draft.longitude,
            category: draft.category,
            status: draft.status,
        }
    }

    fn apply(&mut self, patch: ShopPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(latitude) = patch.latitude {
            self.latitude = latitude;
        }
        if let Some(longitude) = patch.longitude {
            self.longitude = longitude;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Availability of a driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    #[default]
    Available,
    OnRoute,
    OffDuty,
}

impl DriverStatus {
    pub const ALL: [DriverStatus; 3] = [
        DriverStatus::Available,
        DriverStatus::OnRoute,
        DriverStatus::OffDuty,
    ];

    /// Wire name of the status.
    ///
    /// ```
    /// use logistics_dashboard::domain::DriverStatus;
    ///
    /// assert_eq!(DriverStatus::OnRoute.as_str(), "on_route");
    /// assert_eq!(DriverStatus::parse("off_duty"), Some(DriverStatus::OffDuty));
    /// assert_eq!(DriverStatus::parse("sleeping"), None);
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            DriverStatus::Available => "available",
            DriverStatus::OnRoute => "on_route",
            DriverStatus::OffDuty => "off_duty",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

/// A delivery driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: EntityId,
    pub name: String,
    pub phone: String,
    pub vehicle_type: String,
    pub status: DriverStatus,
}

/// Creation input for a [`Driver`].
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewDriver {
    pub name: String,
    pub phone: String,
    pub vehicle_type: String,
    pub status: DriverStatus,
}

impl NewDriver {
    pub fn new(name: impl Into<String>, phone: impl Into<String>, vehicle_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            vehicle_type: vehicle_type.into(),
            status: DriverStatus::default(),
        }
    }

    pub fn with_status(mut self, status: DriverStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update for a [`Driver`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DriverPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub vehicle_type: Option<String>,
    pub status: Option<DriverStatus>,
}

impl Entity for Driver {
    const KIND: EntityKind = EntityKind::Driver;
    type Draft = NewDriver;
    type Patch = DriverPatch;

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_draft(id: EntityId, draft: NewDriver) -> Self {
        Self {
            id,
            name: draft.name,
            phone: draft.phone,
            vehicle_type: draft.vehicle_type,
            status: draft.status,
        }
    }

    fn apply(&mut self, patch: DriverPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(vehicle_type) = patch.vehicle_type {
            self.vehicle_type = vehicle_type;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

// ============================================================================
// Route
// ============================================================================

/// Progress of a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
}

impl RouteStatus {
    pub const ALL: [RouteStatus; 3] = [
        RouteStatus::Planned,
        RouteStatus::InProgress,
        RouteStatus::Completed,
    ];

    /// Wire name of the status.
    ///
    /// ```
    /// use logistics_dashboard::domain::RouteStatus;
    ///
    /// assert_eq!(RouteStatus::InProgress.as_str(), "in_progress");
    /// assert_eq!(RouteStatus::parse("completed"), Some(RouteStatus::Completed));
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            RouteStatus::Planned => "planned",
            RouteStatus::InProgress => "in_progress",
            RouteStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

/// A day's delivery route: shops in visiting order.
///
/// `shop_ids` may name shops that do not exist; nothing enforces
/// referential integrity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: EntityId,
    pub name: String,
    pub driver_id: Option<EntityId>,
    pub shop_ids: Vec<EntityId>,
    pub status: RouteStatus,
    pub date: NaiveDate,
}

/// Creation input for a [`Route`].
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewRoute {
    pub name: String,
    pub driver_id: Option<EntityId>,
    pub shop_ids: Vec<EntityId>,
    pub status: RouteStatus,
    pub date: NaiveDate,
}

impl NewRoute {
    pub fn new(name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            driver_id: None,
            shop_ids: Vec::new(),
            status: RouteStatus::default(),
            date,
        }
    }

    pub fn with_driver(mut self, driver_id: EntityId) -> Self {
        self.driver_id = Some(driver_id);
        self
    }

    pub fn with_shops(mut self, shop_ids: Vec<EntityId>) -> Self {
        self.shop_ids = shop_ids;
        self
    }

    pub fn with_status(mut self, status: RouteStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update for a [`Route`].
///
/// `driver_id` is doubly optional: `Some(None)` unassigns the driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoutePatch {
    pub name: Option<String>,
    #[schema(value_type = Option<u64>)]
    pub driver_id: Option<Option<EntityId>>,
    pub shop_ids: Option<Vec<EntityId>>,
    pub status: Option<RouteStatus>,
    pub date: Option<NaiveDate>,
}

impl Entity for Route {
    const KIND: EntityKind = EntityKind::Route;
    type Draft = NewRoute;
    type Patch = RoutePatch;

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_draft(id: EntityId, draft: NewRoute) -> Self {
        Self {
            id,
            name: draft.name,
            driver_id: draft.driver_id,
            shop_ids: draft.shop_ids,
            status: draft.status,
            date: draft.date,
        }
    }

    fn apply(&mut self, patch: RoutePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(driver_id) = patch.driver_id {
            self.driver_id = driver_id;
        }
        if let Some(shop_ids) = patch.shop_ids {
            self.shop_ids = shop_ids;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
    }
}

// ============================================================================
// Target
// ============================================================================

/// A driver's goal for a period.
///
/// Completed counts move independently of the targets; exceeding a target
/// is allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: EntityId,
    pub driver_id: EntityId,
    pub period: String,
    pub target_shops: u32,
    pub target_deliveries: u32,
    pub completed_shops: u32,
    pub completed_deliveries: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Target {
    /// Share of the delivery target reached, as a percentage.
    ///
    /// A zero target counts as fully met.
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use logistics_dashboard::domain::{Entity, NewTarget, Target};
    ///
    /// let start = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
    /// let end = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
    /// let mut draft = NewTarget::new(1, "monthly", 20, 200, start, end);
    /// draft.completed_deliveries = 50;
    ///
    /// let target = Target::from_draft(7, draft);
    /// assert_eq!(target.delivery_progress(), 25.0);
    /// ```
    pub fn delivery_progress(&self) -> f64 {
        progress(self.completed_deliveries.into(), self.target_deliveries.into())
    }

    /// Share of the shop target reached, as a percentage.
    pub fn shop_progress(&self) -> f64 {
        progress(self.completed_shops.into(), self.target_shops.into())
    }
}

/// Completed share as a percentage; a zero target counts as met.
pub(crate) fn progress(completed: u64, target: u64) -> f64 {
    if target == 0 {
        return 100.0;
    }
    completed as f64 / target as f64 * 100.0
}

/// Creation input for a [`Target`].
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTarget {
    pub driver_id: EntityId,
    pub period: String,
    pub target_shops: u32,
    pub target_deliveries: u32,
    pub completed_shops: u32,
    pub completed_deliveries: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewTarget {
    pub fn new(
        driver_id: EntityId,
        period: impl Into<String>,
        target_shops: u32,
        target_deliveries: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            driver_id,
            period: period.into(),
            target_shops,
            target_deliveries,
            completed_shops: 0,
            completed_deliveries: 0,
            start_date,
            end_date,
        }
    }
}

/// Partial update for a [`Target`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetPatch {
    pub driver_id: Option<EntityId>,
    pub period: Option<String>,
    pub target_shops: Option<u32>,
    pub target_deliveries: Option<u32>,
    pub completed_shops: Option<u32>,
    pub completed_deliveries: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Entity for Target {
    const KIND: EntityKind = EntityKind::Target;
    type Draft = NewTarget;
    type Patch = TargetPatch;

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_draft(id: EntityId, draft: NewTarget) -> Self {
        Self {
            id,
            driver_id: draft.driver_id,
            period: draft.period,
            target_shops: draft.target_shops,
            target_deliveries: draft.target_deliveries,
            completed_shops: draft.completed_shops,
            completed_deliveries: draft.completed_deliveries,
            start_date: draft.start_date,
            end_date: draft.end_date,
        }
    }

    fn apply(&mut self, patch: TargetPatch) {
        if let Some(driver_id) = patch.driver_id {
            self.driver_id = driver_id;
        }
        if let Some(period) = patch.period {
            self.period = period;
        }
        if let Some(target_shops) = patch.target_shops {
            self.target_shops = target_shops;
        }
        if let Some(target_deliveries) = patch.target_deliveries {
            self.target_deliveries = target_deliveries;
        }
        if let Some(completed_shops) = patch.completed_shops {
            self.completed_shops = completed_shops;
        }
        if let Some(completed_deliveries) = patch.completed_deliveries {
            self.completed_deliveries = completed_deliveries;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
    }
}

// ============================================================================
// Optimization results
// ============================================================================

/// Output of a route optimization run.
///
/// Distances are kilometres, `time_saved` minutes, `fuel_saved` litres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteOptimizationResult {
    /// Shop ids in the suggested visiting order.
    pub optimized_order: Vec<EntityId>,
    pub original_distance: f64,
    pub optimized_distance: f64,
    pub time_saved: f64,
    pub fuel_saved: f64,
    pub suggestions: Vec<String>,
}

/// An entry in the optimization history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRecord {
    pub id: Uuid,
    pub route_id: EntityId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: RouteOptimizationResult,
}
