//! Document-store capabilities consumed by the checkout pipeline.
//!
//! The hosted document database is reached through these traits; the core
//! never sees a concrete client. [`MemoryStore`] implements every trait
//! over [`DashMap`] shards and backs both default wiring and tests. The
//! hosted-store client plugs in by implementing the same traits.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{Coupon, Order, PendingCheckout, ProductRecord};

pub mod price;

/// Maximum number of keys the backing store accepts in one `in` query.
/// Callers must partition larger id sets into batches of this size.
pub const IN_QUERY_LIMIT: usize = 10;

/// Outcome of an atomic paid-order commit keyed by gateway payment id.
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    /// This call won the commit; the order was persisted.
    Created(Order),
    /// A prior commit for the same payment id already exists.
    AlreadyProcessed { order_id: Uuid },
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Batched lookup by identifier. Each returned pair is
    /// `(document_id, record)`; a requested id matches either the document
    /// id or the record's explicit `id` field (legacy documents disagree
    /// on which one external references use).
    ///
    /// `ids` must not exceed [`IN_QUERY_LIMIT`] entries.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<(String, ProductRecord)>, ServiceError>;

    async fn list(&self) -> Result<Vec<(String, ProductRecord)>, ServiceError>;

    async fn get(&self, doc_id: &str) -> Result<Option<ProductRecord>, ServiceError>;

    async fn insert(&self, doc_id: String, record: ProductRecord) -> Result<(), ServiceError>;

    /// Returns false when no document with this id exists.
    async fn update(&self, doc_id: &str, record: ProductRecord) -> Result<bool, ServiceError>;

    /// Returns false when no document with this id exists.
    async fn delete(&self, doc_id: &str) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Point lookup by normalized (uppercased) code, restricted to active
    /// coupons. Inactive and unknown codes are indistinguishable here.
    async fn find_active(&self, code: &str) -> Result<Option<Coupon>, ServiceError>;

    /// Increments the coupon's usage count. Called exactly once per
    /// committed order, via the redemption hook.
    async fn record_redemption(&self, code: &str) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// First-writer-wins insert keyed by `payment_id`. Exactly one call
    /// per distinct payment id ever observes [`CommitOutcome::Created`];
    /// concurrent and later callers observe `AlreadyProcessed`.
    async fn commit_paid_order(
        &self,
        payment_id: &str,
        order: Order,
    ) -> Result<CommitOutcome, ServiceError>;

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, ServiceError>;

    /// Plain insert for orders without a gateway payment (cash on delivery).
    async fn insert(&self, order: Order) -> Result<Order, ServiceError>;

    async fn get(&self, id: Uuid) -> Result<Option<Order>, ServiceError>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>, ServiceError>;
}

#[async_trait]
pub trait PendingCheckoutStore: Send + Sync {
    async fn put(&self, pending: PendingCheckout) -> Result<(), ServiceError>;

    async fn get(&self, gateway_order_id: &str) -> Result<Option<PendingCheckout>, ServiceError>;

    async fn remove(&self, gateway_order_id: &str) -> Result<(), ServiceError>;
}

/// In-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: DashMap<String, ProductRecord>,
    coupons: DashMap<String, Coupon>,
    orders: DashMap<Uuid, Order>,
    payment_index: DashMap<String, Uuid>,
    pending: DashMap<String, PendingCheckout>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_product(&self, doc_id: &str, record: ProductRecord) {
        self.products.insert(doc_id.to_string(), record);
    }

    pub fn seed_coupon(&self, coupon: Coupon) {
        self.coupons.insert(coupon.code.to_uppercase(), coupon);
    }

    pub fn coupon_usage(&self, code: &str) -> Option<i64> {
        self.coupons
            .get(&code.to_uppercase())
            .map(|c| c.usage_count)
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<(String, ProductRecord)>, ServiceError> {
        if ids.len() > IN_QUERY_LIMIT {
            return Err(ServiceError::StoreError(format!(
                "in-query with {} keys exceeds the limit of {}",
                ids.len(),
                IN_QUERY_LIMIT
            )));
        }

        let matches = self
            .products
            .iter()
            .filter(|entry| {
                ids.iter()
                    .any(|id| id == entry.key() || *id == entry.value().id)
            })
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        Ok(matches)
    }

    async fn list(&self) -> Result<Vec<(String, ProductRecord)>, ServiceError> {
        Ok(self
            .products
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    async fn get(&self, doc_id: &str) -> Result<Option<ProductRecord>, ServiceError> {
        Ok(self.products.get(doc_id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, doc_id: String, record: ProductRecord) -> Result<(), ServiceError> {
        self.products.insert(doc_id, record);
        Ok(())
    }

    async fn update(&self, doc_id: &str, record: ProductRecord) -> Result<bool, ServiceError> {
        match self.products.get_mut(doc_id) {
            Some(mut entry) => {
                *entry = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, doc_id: &str) -> Result<bool, ServiceError> {
        Ok(self.products.remove(doc_id).is_some())
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn find_active(&self, code: &str) -> Result<Option<Coupon>, ServiceError> {
        Ok(self
            .coupons
            .get(code)
            .filter(|entry| entry.is_active)
            .map(|entry| entry.value().clone()))
    }

    async fn record_redemption(&self, code: &str) -> Result<(), ServiceError> {
        match self.coupons.get_mut(code) {
            Some(mut entry) => {
                entry.usage_count += 1;
                Ok(())
            }
            None => Err(ServiceError::StoreError(format!(
                "redemption recorded for unknown coupon {code}"
            ))),
        }
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn commit_paid_order(
        &self,
        payment_id: &str,
        order: Order,
    ) -> Result<CommitOutcome, ServiceError> {
        // The entry API holds the shard lock, so two concurrent commits
        // for one payment id cannot both insert.
        match self.payment_index.entry(payment_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => Ok(CommitOutcome::AlreadyProcessed {
                order_id: *existing.get(),
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(order.id);
                self.orders.insert(order.id, order.clone());
                Ok(CommitOutcome::Created(order))
            }
        }
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, ServiceError> {
        let order_id = match self.payment_index.get(payment_id) {
            Some(entry) => *entry.value(),
            None => return Ok(None),
        };
        Ok(self.orders.get(&order_id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, order: Order) -> Result<Order, ServiceError> {
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, ServiceError> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>, ServiceError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

#[async_trait]
impl PendingCheckoutStore for MemoryStore {
    async fn put(&self, pending: PendingCheckout) -> Result<(), ServiceError> {
        self.pending.insert(pending.gateway_order_id.clone(), pending);
        Ok(())
    }

    async fn get(&self, gateway_order_id: &str) -> Result<Option<PendingCheckout>, ServiceError> {
        Ok(self
            .pending
            .get(gateway_order_id)
            .map(|entry| entry.value().clone()))
    }

    async fn remove(&self, gateway_order_id: &str) -> Result<(), ServiceError> {
        self.pending.remove(gateway_order_id);
        Ok(())
    }
}
