//! In-memory collaborators for engine tests
//!
//! - [`InMemoryOrderStore`]: order source and inventory ledger over one lock
//! - [`FailingOrderSource`]: an order source whose backend is always down

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use bean_route_core::{
    BoxFuture, CoffeeId, DeliveryReceipt, InventoryError, InventoryLedger, Order, OrderId,
    OrderSource, OrderStatus, ShopId, ShopStock, SourceError, StatusFilter, StoredTotalPolicy,
    delivery_credits, ensure_deliverable,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    orders: Vec<Order>,
    stock: BTreeMap<(ShopId, CoffeeId), ShopStock>,
}

/// In-memory orders plus shop stock.
///
/// Every ledger operation holds the single lock for its whole duration, which
/// gives the same all-or-nothing behaviour as the database transaction.
///
/// # Example
///
/// ```
/// use bean_route_core::{InventoryLedger, OrderId, OrderStatus, StoredTotalPolicy};
/// use bean_route_testing::{InMemoryOrderStore, OrderBuilder};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryOrderStore::new();
/// store.insert(
///     OrderBuilder::new("o1")
///         .status(OrderStatus::Shipped)
///         .legacy_small("c1", "Bedecho", 9)
///         .build(),
/// );
///
/// let receipt = store
///     .credit_delivery(OrderId::new("o1"), StoredTotalPolicy::Ignore)
///     .await?;
/// assert_eq!(receipt.total.kg(), 1.8);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryOrderStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryOrderStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `orders`
    #[must_use]
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        for order in orders {
            store.insert(order);
        }
        store
    }

    /// Insert an order, replacing any order with the same id
    pub fn insert(&self, order: Order) {
        let mut inner = self.inner.lock().unwrap();
        match inner.orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order,
            None => inner.orders.push(order),
        }
    }

    /// Current copy of an order
    #[must_use]
    pub fn order(&self, id: &OrderId) -> Option<Order> {
        self.inner
            .lock()
            .unwrap()
            .orders
            .iter()
            .find(|o| &o.id == id)
            .cloned()
    }

    /// Number of stored orders
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().orders.len()
    }

    /// Check if the store has no orders
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().orders.is_empty()
    }

    /// Drop all orders and stock (for test isolation)
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.orders.clear();
        inner.stock.clear();
    }
}

impl OrderSource for InMemoryOrderStore {
    fn fetch_orders(&self, filter: StatusFilter) -> BoxFuture<'_, Result<Vec<Order>, SourceError>> {
        Box::pin(async move {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .orders
                .iter()
                .filter(|o| filter.matches(o.status))
                .cloned()
                .collect())
        })
    }

    fn fetch_order(&self, id: OrderId) -> BoxFuture<'_, Result<Option<Order>, SourceError>> {
        Box::pin(async move { Ok(self.order(&id)) })
    }
}

impl InventoryLedger for InMemoryOrderStore {
    fn credit_delivery(
        &self,
        order_id: OrderId,
        policy: StoredTotalPolicy,
    ) -> BoxFuture<'_, Result<DeliveryReceipt, InventoryError>> {
        Box::pin(async move {
            let mut guard = self.inner.lock().unwrap();
            let inner = &mut *guard;

            let order = inner
                .orders
                .iter_mut()
                .find(|o| o.id == order_id)
                .ok_or_else(|| InventoryError::OrderNotFound(order_id.clone()))?;
            ensure_deliverable(&order.id, order.status)?;

            let plan = delivery_credits(order, policy);
            let now = Utc::now();
            for credit in &plan.credits {
                inner
                    .stock
                    .entry((credit.shop_id.clone(), credit.coffee_id.clone()))
                    .or_default()
                    .apply(credit, now);
            }

            let previous_status = order.status;
            order.status = OrderStatus::Delivered;

            let receipt = plan.into_receipt(order_id, previous_status);
            tracing::info!(
                order_id = %receipt.order_id,
                credits = receipt.credits.len(),
                skipped = receipt.skipped.len(),
                flagged = receipt.flagged.len(),
                total_kg = receipt.total.kg(),
                "Credited delivery (in-memory)"
            );

            Ok(receipt)
        })
    }

    fn stock(
        &self,
        shop_id: ShopId,
        coffee_id: CoffeeId,
    ) -> BoxFuture<'_, Result<Option<ShopStock>, InventoryError>> {
        Box::pin(async move {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .stock
                .get(&(shop_id, coffee_id))
                .cloned())
        })
    }
}

/// Order source whose backend is always unavailable.
///
/// Useful for checking that fetch failures reach the caller unchanged.
#[derive(Clone, Debug)]
pub struct FailingOrderSource {
    error: SourceError,
}

impl FailingOrderSource {
    /// Fail every call with `error`
    #[must_use]
    pub const fn new(error: SourceError) -> Self {
        Self { error }
    }
}

impl Default for FailingOrderSource {
    fn default() -> Self {
        Self::new(SourceError::Database("connection refused".to_string()))
    }
}

impl OrderSource for FailingOrderSource {
    fn fetch_orders(&self, _filter: StatusFilter) -> BoxFuture<'_, Result<Vec<Order>, SourceError>> {
        let error = self.error.clone();
        Box::pin(async move { Err(error) })
    }

    fn fetch_order(&self, _id: OrderId) -> BoxFuture<'_, Result<Option<Order>, SourceError>> {
        let error = self.error.clone();
        Box::pin(async move { Err(error) })
    }
}
