//! Schema checks for incoming entity payloads.
//!
//! Creation payloads are checked for required fields, types and enum
//! membership, and absent optional fields are filled with their defaults.
//! Patch payloads skip the required-field checks: every field is optional,
//! but any field that is present must still have the right type.
//!
//! A failure reports every violated field at once, not just the first.
//! Unknown keys are ignored and never reach the store.
//!
//! Type rules:
//! - numbers must be JSON numbers; numeric-looking strings are rejected
//! - integers reject fractional values (a whole `10.0` is accepted)
//! - counts and id references must not be negative
//! - dates are `YYYY-MM-DD` strings
//! - `null` counts as absent, except for a route's `driverId` where it
//!   means "no driver"

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use utoipa::ToSchema;

use crate::domain::{
    Driver, DriverPatch, DriverStatus, Entity, EntityId, NewDriver, NewRoute, NewShop, NewTarget,
    Route, RoutePatch, RouteStatus, Shop, ShopPatch, Target, TargetPatch, DEFAULT_SHOP_CATEGORY,
    DEFAULT_SHOP_STATUS, MAX_ROUTE_STOPS,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    /// Field name as sent by the client (`shopIds[2]` for list items).
    pub field: String,
    pub message: String,
}

/// Every constraint a payload violated.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {}", describe(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// True if `field` has at least one violation.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Entity kinds whose payloads can be validated.
///
/// # Examples
///
/// ```
/// use logistics_dashboard::domain::Shop;
/// use logistics_dashboard::validation::Validated;
/// use serde_json::json;
///
/// let draft = Shop::draft(&json!({"name": "X", "latitude": -1.26, "longitude": 36.86})).unwrap();
/// assert_eq!(draft.category, "retail");
/// assert_eq!(draft.status, "active");
///
/// let err = Shop::draft(&json!({"latitude": -1.26, "longitude": 36.86})).unwrap_err();
/// assert!(err.has_field("name"));
/// ```
pub trait Validated: Entity {
    /// Checks a creation payload and applies defaults.
    fn draft(input: &Value) -> Result<Self::Draft, ValidationErrors>;

    /// Checks a partial-update payload.
    fn patch(input: &Value) -> Result<Self::Patch, ValidationErrors>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    Optional,
    Required,
    /// Required, and a string must not be blank.
    NonEmpty,
}

impl Requirement {
    fn is_required(self) -> bool {
        !matches!(self, Requirement::Optional)
    }
}

/// Walks the fields of one JSON object, collecting violations.
struct Fields<'a> {
    object: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
    fn new(input: &'a Value) -> Result<Self, ValidationErrors> {
        match input {
            Value::Object(object) => Ok(Self {
                object,
                errors: Vec::new(),
            }),
            _ => Err(ValidationErrors {
                errors: vec![FieldError {
                    field: "body".to_string(),
                    message: "must be a JSON object".to_string(),
                }],
            }),
        }
    }

    fn fail(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// The value under `key`, treating `null` as absent. Records a
    /// "required" violation when a required field is missing.
    fn present(&mut self, key: &str, requirement: Requirement) -> Option<&'a Value> {
        match self.object.get(key) {
            None | Some(Value::Null) => {
                if requirement.is_required() {
                    self.fail(key, "is required");
                }
                None
            }
            Some(value) => Some(value),
        }
    }

    fn string(&mut self, key: &str, requirement: Requirement) -> Option<String> {
        match self.present(key, requirement)? {
            Value::String(s) if requirement == Requirement::NonEmpty && s.trim().is_empty() => {
                self.fail(key, "must not be empty");
                None
            }
            Value::String(s) => Some(s.clone()),
            _ => {
                self.fail(key, "must be a string");
                None
            }
        }
    }

    fn number(&mut self, key: &str, requirement: Requirement) -> Option<f64> {
        match self.present(key, requirement)? {
            Value::Number(n) => n.as_f64(),
            _ => {
                self.fail(key, "must be a number");
                None
            }
        }
    }

    fn integer(&mut self, key: &str, requirement: Requirement) -> Option<u64> {
        let value = self.present(key, requirement)?;
        self.integer_value(key, value)
    }

    fn integer_value(&mut self, field: &str, value: &Value) -> Option<u64> {
        let Value::Number(n) = value else {
            self.fail(field, "must be an integer");
            return None;
        };
        match non_negative_integer(n) {
            Ok(v) => Some(v),
            Err(message) => {
                self.fail(field, message);
                None
            }
        }
    }

    fn count(&mut self, key: &str, requirement: Requirement) -> Option<u32> {
        let value = self.integer(key, requirement)?;
        match u32::try_from(value) {
            Ok(v) => Some(v),
            Err(_) => {
                self.fail(key, "is too large");
                None
            }
        }
    }

    /// A nullable id: `Some(None)` for an explicit `null`.
    fn nullable_id(&mut self, key: &str) -> Option<Option<EntityId>> {
        match self.object.get(key)? {
            Value::Null => Some(None),
            value => self.integer_value(key, value).map(Some),
        }
    }

    fn id_list(&mut self, key: &str) -> Option<Vec<EntityId>> {
        let Value::Array(items) = self.present(key, Requirement::Optional)? else {
            self.fail(key, "must be an array of ids");
            return None;
        };
        if items.len() > MAX_ROUTE_STOPS {
            self.fail(key, format!("must not contain more than {MAX_ROUTE_STOPS} ids"));
            return None;
        }

        let before = self.errors.len();
        let ids: Vec<EntityId> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| self.integer_value(&format!("{key}[{i}]"), item))
            .collect();
        (self.errors.len() == before).then_some(ids)
    }

    fn date(&mut self, key: &str, requirement: Requirement) -> Option<NaiveDate> {
        let parsed = match self.present(key, requirement)? {
            Value::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT).ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.fail(key, "must be a date (YYYY-MM-DD)");
        }
        parsed
    }

    fn choice<T: Copy>(
        &mut self,
        key: &str,
        all: &[T],
        name: fn(T) -> &'static str,
    ) -> Option<T> {
        let value = self.present(key, Requirement::Optional)?;
        let found = value
            .as_str()
            .and_then(|s| all.iter().copied().find(|v| name(*v) == s));
        if found.is_none() {
            let allowed: Vec<&str> = all.iter().map(|v| name(*v)).collect();
            self.fail(key, format!("must be one of: {}", allowed.join(", ")));
        }
        found
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                errors: self.errors,
            })
        }
    }
}

fn non_negative_integer(n: &Number) -> Result<u64, &'static str> {
    if let Some(v) = n.as_u64() {
        return Ok(v);
    }
    if n.is_i64() {
        return Err("must not be negative");
    }
    match n.as_f64() {
        Some(f) if f.fract() != 0.0 => Err("must be an integer"),
        Some(f) if f < 0.0 => Err("must not be negative"),
        Some(f) if f < u64::MAX as f64 => Ok(f as u64),
        _ => Err("is out of range"),
    }
}

/// Shared tail of every draft builder: a missing required value always
/// comes with a recorded violation, so `None` here means `Err`.
fn complete<T>(fields: Fields<'_>, draft: Option<T>) -> Result<T, ValidationErrors> {
    fields.finish()?;
    draft.ok_or_else(ValidationErrors::default)
}

// ============================================================================
// Per-kind schemas
// ============================================================================

impl Validated for Shop {
    fn draft(input: &Value) -> Result<NewShop, ValidationErrors> {
        let mut f = Fields::new(input)?;
        let name = f.string("name", Requirement::NonEmpty);
        let latitude = f.number("latitude", Requirement::Required);
        let longitude = f.number("longitude", Requirement::Required);
        let category = f.string("category", Requirement::Optional);
        let status = f.string("status", Requirement::Optional);

        let draft = match (name, latitude, longitude) {
            (Some(name), Some(latitude), Some(longitude)) => Some(NewShop {
                name,
                latitude,
                longitude,
                category: category.unwrap_or_else(|| DEFAULT_SHOP_CATEGORY.to_string()),
                status: status.unwrap_or_else(|| DEFAULT_SHOP_STATUS.to_string()),
            }),
            _ => None,
        };
        complete(f, draft)
    }

    fn patch(input: &Value) -> Result<ShopPatch, ValidationErrors> {
        let mut f = Fields::new(input)?;
        let patch = ShopPatch {
            name: f.string("name", Requirement::Optional),
            latitude: f.number("latitude", Requirement::Optional),
            longitude: f.number("longitude", Requirement::Optional),
            category: f.string("category", Requirement::Optional),
            status: f.string("status", Requirement::Optional),
        };
        f.finish()?;
        Ok(patch)
    }
}

impl Validated for Driver {
    fn draft(input: &Value) -> Result<NewDriver, ValidationErrors> {
        let mut f = Fields::new(input)?;
        let name = f.string("name", Requirement::NonEmpty);
        let phone = f.string("phone", Requirement::NonEmpty);
        let vehicle_type = f.string("vehicleType", Requirement::NonEmpty);
        let status = f.choice("status", &DriverStatus::ALL, DriverStatus::as_str);

        let draft = match (name, phone, vehicle_type) {
            (Some(name), Some(phone), Some(vehicle_type)) => Some(NewDriver {
                name,
                phone,
                vehicle_type,
                status: status.unwrap_or_default(),
            }),
            _ => None,
        };
        complete(f, draft)
    }

    fn patch(input: &Value) -> Result<DriverPatch, ValidationErrors> {
        let mut f = Fields::new(input)?;
        let patch = DriverPatch {
            name: f.string("name", Requirement::Optional),
            phone: f.string("phone", Requirement::Optional),
            vehicle_type: f.string("vehicleType", Requirement::Optional),
            status: f.choice("status", &DriverStatus::ALL, DriverStatus::as_str),
        };
        f.finish()?;
        Ok(patch)
    }
}

impl Validated for Route {
    fn draft(input: &Value) -> Result<NewRoute, ValidationErrors> {
        let mut f = Fields::new(input)?;
        let name = f.string("name", Requirement::NonEmpty);
        let driver_id = f.nullable_id("driverId").flatten();
        let shop_ids = f.id_list("shopIds");
        let status = f.choice("status", &RouteStatus::ALL, RouteStatus::as_str);
        let date = f.date("date", Requirement::Required);

        let draft = match (name, date) {
            (Some(name), Some(date)) => Some(NewRoute {
                name,
                driver_id,
                shop_ids: shop_ids.unwrap_or_default(),
                status: status.unwrap_or_default(),
                date,
            }),
            _ => None,
        };
        complete(f, draft)
    }

    fn patch(input: &Value) -> Result<RoutePatch, ValidationErrors> {
        let mut f = Fields::new(input)?;
        let patch = RoutePatch {
            name: f.string("name", Requirement::Optional),
            driver_id: f.nullable_id("driverId"),
            shop_ids: f.id_list("shopIds"),
            status: f.choice("status", &RouteStatus::ALL, RouteStatus::as_str),
            date: f.date("date", Requirement::Optional),
        };
        f.finish()?;
        Ok(patch)
    }
}

impl Validated for Target {
    fn draft(input: &Value) -> Result<NewTarget, ValidationErrors> {
        let mut f = Fields::new(input)?;
        let driver_id = f.integer("driverId", Requirement::Required);
        let period = f.string("period", Requirement::NonEmpty);
        let target_shops = f.count("targetShops", Requirement::Required);
        let target_deliveries = f.count("targetDeliveries", Requirement::Required);
        let completed_shops = f.count("completedShops", Requirement::Optional);
        let completed_deliveries = f.count("completedDeliveries", Requirement::Optional);
        let start_date = f.date("startDate", Requirement::Required);
        let end_date = f.date("endDate", Requirement::Required);

        let draft = match (driver_id, period, target_shops, target_deliveries, start_date, end_date) {
            (
                Some(driver_id),
                Some(period),
                Some(target_shops),
                Some(target_deliveries),
                Some(start_date),
                Some(end_date),
            ) => Some(NewTarget {
                driver_id,
                period,
                target_shops,
                target_deliveries,
                completed_shops: completed_shops.unwrap_or(0),
                completed_deliveries: completed_deliveries.unwrap_or(0),
                start_date,
                end_date,
            }),
            _ => None,
        };
        complete(f, draft)
    }

    fn patch(input: &Value) -> Result<TargetPatch, ValidationErrors> {
        let mut f = Fields::new(input)?;
        let patch = TargetPatch {
            driver_id: f.integer("driverId", Requirement::Optional),
            period: f.string("period", Requirement::Optional),
            target_shops: f.count("targetShops", Requirement::Optional),
            target_deliveries: f.count("targetDeliveries", Requirement::Optional),
            completed_shops: f.count("completedShops", Requirement::Optional),
            completed_deliveries: f.count("completedDeliveries", Requirement::Optional),
            start_date: f.date("startDate", Requirement::Optional),
            end_date: f.date("endDate", Requirement::Optional),
        };
        f.finish()?;
        Ok(patch)
    }
}
