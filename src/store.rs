//! In-memory entity store.
//!
//! [`EntityStore`] owns one [`Collection`] per entity kind and a single id
//! counter shared by all of them, so ids are unique across kinds for the
//! lifetime of the store. Ids are never reused, even after a delete. A new
//! store starts counting from 1 again.
//!
//! Records are kept in a `BTreeMap` keyed by id; since ids only grow, key
//! order is insertion order.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::domain::{Driver, Entity, EntityId, Route, Shop, Target};

/// Records of one entity kind.
pub struct Collection<T: Entity> {
    records: RwLock<BTreeMap<EntityId, T>>,
    next_id: Arc<AtomicU64>,
}

impl<T: Entity> Collection<T> {
    fn new(next_id: Arc<AtomicU64>) -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id,
        }
    }

    /// Lists all records in insertion order.
    pub fn get_all(&self) -> Vec<T> {
        self.records.read().values().cloned().collect()
    }

    /// Gets a record by id.
    pub fn get(&self, id: EntityId) -> Option<T> {
        self.records.read().get(&id).cloned()
    }

    /// Stores a new record built from `draft` under a fresh id.
    pub fn create(&self, draft: T::Draft) -> T {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = T::from_draft(id, draft);
        self.records.write().insert(record.id(), record.clone());
        debug!(kind = %T::KIND, id = record.id(), "Created record");
        record
    }

    /// Merges `patch` into the record with `id`.
    ///
    /// Returns `None` without touching anything when the id is unknown.
    pub fn update(&self, id: EntityId, patch: T::Patch) -> Option<T> {
        let mut records = self.records.write();
        let record = records.get_mut(&id)?;
        record.apply(patch);
        debug!(kind = %T::KIND, id, "Updated record");
        Some(record.clone())
    }

    /// Removes the record with `id`. Returns false if there was none.
    pub fn delete(&self, id: EntityId) -> bool {
        let removed = self.records.write().remove(&id).is_some();
        if removed {
            debug!(kind = %T::KIND, id, "Deleted record");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

/// Exclusive owner of every shop, driver, route and target.
///
/// # Examples
///
/// ```
/// use logistics_dashboard::domain::{NewDriver, NewShop};
/// use logistics_dashboard::store::EntityStore;
///
/// let store = EntityStore::new();
/// let shop = store.shops.create(NewShop::new("Duka la Mama", -1.26, 36.86));
/// let driver = store.drivers.create(NewDriver::new("Otieno", "+254700000000", "motorbike"));
///
/// // Ids come from one counter shared by every kind
/// assert_ne!(shop.id, driver.id);
/// assert_eq!(store.shops.get(shop.id), Some(shop));
/// ```
pub struct EntityStore {
    pub shops: Collection<Shop>,
    pub drivers: Collection<Driver>,
    pub routes: Collection<Route>,
    pub targets: Collection<Target>,
}

impl EntityStore {
    /// Creates an empty store whose first id is 1.
    pub fn new() -> Self {
        let next_id = Arc::new(AtomicU64::new(1));
        Self {
            shops: Collection::new(next_id.clone()),
            drivers: Collection::new(next_id.clone()),
            routes: Collection::new(next_id.clone()),
            targets: Collection::new(next_id),
        }
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Selects the collection holding a given entity kind.
///
/// Lets generic code (handlers, tests) reach `store.shops` as
/// `Shop::collection(&store)`.
pub trait Stored: Entity {
    fn collection(store: &EntityStore) -> &Collection<Self>;
}

impl Stored for Shop {
    fn collection(store: &EntityStore) -> &Collection<Self> {
        &store.shops
    }
}

impl Stored for Driver {
    fn collection(store: &EntityStore) -> &Collection<Self> {
        &store.drivers
    }
}

impl Stored for Route {
    fn collection(store: &EntityStore) -> &Collection<Self> {
        &store.routes
    }
}

impl Stored for Target {
    fn collection(store: &EntityStore) -> &Collection<Self> {
        &store.targets
    }
}
