//! Crediting delivered orders into shop inventory.
//!
//! [`delivery_credits`] is the pure half: it turns one order into one credit
//! per coffee using the same normalizer and fold as the reports, and keeps the
//! items that fold skipped or flagged so the receipt can report them. The
//! [`InventoryLedger`] trait is the mutating half. An implementation must
//! apply all of an order's credits and its move to `DELIVERED` in one atomic
//! step, and must refuse an order that is already delivered. That check makes
//! a second confirmation of the same delivery a no-op instead of a double
//! credit.

use crate::aggregate::{
    AggregationOptions, FlaggedItem, KeyStrategy, SkippedItem, StatusFilter, aggregate_orders,
};
use crate::error::InventoryError;
use crate::normalize::StoredTotalPolicy;
use crate::types::{CoffeeId, Order, OrderId, OrderStatus, ShopId};
use crate::weight::Weight;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Quantities of one coffee to add to one shop's stock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCredit {
    /// Receiving shop
    pub shop_id: ShopId,
    /// Coffee
    pub coffee_id: CoffeeId,
    /// 200g espresso bags
    pub small_bags_espresso: u64,
    /// 200g filter bags
    pub small_bags_filter: u64,
    /// 500g espresso bags
    pub medium_bags_espresso: u64,
    /// 500g filter bags
    pub medium_bags_filter: u64,
    /// 1kg bags
    pub large_bags: u64,
    /// Total weight credited
    #[serde(rename = "total_kg")]
    pub total: Weight,
}

/// Current stock of one coffee at one shop.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopStock {
    /// 200g espresso bags
    pub small_bags_espresso: u64,
    /// 200g filter bags
    pub small_bags_filter: u64,
    /// 500g espresso bags
    pub medium_bags_espresso: u64,
    /// 500g filter bags
    pub medium_bags_filter: u64,
    /// 1kg bags
    pub large_bags: u64,
    /// Total weight on hand
    #[serde(rename = "total_kg")]
    pub total: Weight,
    /// Last change, if the row has been written
    pub updated_at: Option<DateTime<Utc>>,
}

impl ShopStock {
    /// Adds a credit to this stock level.
    pub fn apply(&mut self, credit: &InventoryCredit, at: DateTime<Utc>) {
        self.small_bags_espresso += credit.small_bags_espresso;
        self.small_bags_filter += credit.small_bags_filter;
        self.medium_bags_espresso += credit.medium_bags_espresso;
        self.medium_bags_filter += credit.medium_bags_filter;
        self.large_bags += credit.large_bags;
        self.total += credit.total;
        self.updated_at = Some(at);
    }
}

/// What a successful delivery changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Delivered order
    pub order_id: OrderId,
    /// Status the order moved from
    pub previous_status: OrderStatus,
    /// Credits applied, ordered by coffee id
    pub credits: Vec<InventoryCredit>,
    /// Sum of the credits
    #[serde(rename = "total_kg")]
    pub total: Weight,
    /// Items that credited nothing because they have no coffee
    pub skipped: Vec<SkippedItem>,
    /// Items with a stored total but no bag counts
    pub flagged: Vec<FlaggedItem>,
}

impl DeliveryReceipt {
    /// Some items were skipped or flagged, so the credited stock may not match
    /// what was physically delivered.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty() || !self.flagged.is_empty()
    }
}

/// Everything delivering one order would change, before it is applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryPlan {
    /// One credit per coffee, ordered by coffee id
    pub credits: Vec<InventoryCredit>,
    /// Items without a coffee
    pub skipped: Vec<SkippedItem>,
    /// Items with a stored total but no bag counts
    pub flagged: Vec<FlaggedItem>,
}

impl DeliveryPlan {
    /// Sum of the credits.
    #[must_use]
    pub fn total(&self) -> Weight {
        self.credits.iter().map(|c| c.total).sum()
    }

    /// Some items were skipped or flagged.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty() || !self.flagged.is_empty()
    }

    /// The receipt for applying this plan to `order_id`.
    #[must_use]
    pub fn into_receipt(self, order_id: OrderId, previous_status: OrderStatus) -> DeliveryReceipt {
        DeliveryReceipt {
            order_id,
            previous_status,
            total: self.total(),
            credits: self.credits,
            skipped: self.skipped,
            flagged: self.flagged,
        }
    }
}

/// Check that an order in `status` may be delivered.
///
/// # Errors
///
/// [`InventoryError::AlreadyDelivered`] for delivered orders,
/// [`InventoryError::InvalidTransition`] for cancelled ones.
pub fn ensure_deliverable(order_id: &OrderId, status: OrderStatus) -> Result<(), InventoryError> {
    match status {
        OrderStatus::Delivered => Err(InventoryError::AlreadyDelivered(order_id.clone())),
        OrderStatus::Cancelled => Err(InventoryError::InvalidTransition {
            order_id: order_id.clone(),
            from: status,
        }),
        OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Shipped => Ok(()),
    }
}

/// Credits for delivering `order`, one per coffee, ordered by coffee id,
/// together with the items that could not be credited normally.
///
/// Ordering by coffee id gives every ledger the same row-locking order.
#[must_use]
pub fn delivery_credits(order: &Order, policy: StoredTotalPolicy) -> DeliveryPlan {
    let options = AggregationOptions::new()
        .with_status_filter(StatusFilter::Any)
        .with_key_strategy(KeyStrategy::CoffeeOnly)
        .with_stored_total_policy(policy);
    let report = aggregate_orders(std::slice::from_ref(order), &options);

    let mut credits: Vec<InventoryCredit> = report
        .buckets
        .into_iter()
        .map(|bucket| InventoryCredit {
            shop_id: order.shop.id.clone(),
            coffee_id: bucket.key.coffee_id().clone(),
            small_bags_espresso: bucket.totals.small_bags_espresso,
            small_bags_filter: bucket.totals.small_bags_filter,
            medium_bags_espresso: bucket.totals.medium_bags_espresso,
            medium_bags_filter: bucket.totals.medium_bags_filter,
            large_bags: bucket.totals.large_bags,
            total: bucket.totals.total,
        })
        .collect();
    credits.sort_by(|a, b| a.coffee_id.cmp(&b.coffee_id));

    DeliveryPlan {
        credits,
        skipped: report.skipped,
        flagged: report.flagged,
    }
}

/// Shop inventory store.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the ledger can be shared as
/// `Arc<dyn InventoryLedger>`.
pub trait InventoryLedger: Send + Sync {
    /// Mark an order delivered and credit its quantities, atomically.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound`: no such order
    /// - `AlreadyDelivered`: the order was credited before; nothing changes
    /// - `InvalidTransition`: the order is cancelled
    /// - `Storage`: backend failure; nothing changes
    fn credit_delivery(
        &self,
        order_id: OrderId,
        policy: StoredTotalPolicy,
    ) -> BoxFuture<'_, Result<DeliveryReceipt, InventoryError>>;

    /// Current stock of a coffee at a shop, `None` if never credited.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure.
    fn stock(
        &self,
        shop_id: ShopId,
        coffee_id: CoffeeId,
    ) -> BoxFuture<'_, Result<Option<ShopStock>, InventoryError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CoffeeRef, OrderLineItem, ShopRef};

    fn order(items: Vec<OrderLineItem>) -> Order {
        Order {
            id: OrderId::new("o1"),
            status: OrderStatus::Shipped,
            shop: ShopRef::new("s1", "Harbour"),
            items,
        }
    }

    #[test]
    fn one_credit_per_coffee() {
        let kii = CoffeeRef::new("c-kii", "Kii");
        let bedecho = CoffeeRef::new("c-bed", "Bedecho");
        let plan = delivery_credits(
            &order(vec![
                OrderLineItem {
                    small_bags_espresso: Some(2),
                    ..OrderLineItem::for_coffee(kii.clone())
                },
                OrderLineItem {
                    large_bags: Some(1),
                    ..OrderLineItem::for_coffee(bedecho)
                },
                OrderLineItem {
                    medium_bags_filter: Some(2),
                    ..OrderLineItem::for_coffee(kii)
                },
            ]),
            StoredTotalPolicy::Ignore,
        );
        let credits = &plan.credits;

        assert!(!plan.is_partial());
        assert_eq!(plan.total().grams(), 2400);
        assert_eq!(credits.len(), 2);
        assert_eq!(credits[0].coffee_id.as_str(), "c-bed");
        assert_eq!(credits[0].total.grams(), 1000);
        assert_eq!(credits[1].coffee_id.as_str(), "c-kii");
        assert_eq!(credits[1].small_bags_espresso, 2);
        assert_eq!(credits[1].medium_bags_filter, 2);
        assert_eq!(credits[1].total.grams(), 1400);
        assert!(credits.iter().all(|c| c.shop_id.as_str() == "s1"));
    }

    #[test]
    fn credits_ignore_order_status() {
        let mut delivered = order(vec![OrderLineItem {
            large_bags: Some(1),
            ..OrderLineItem::for_coffee(CoffeeRef::new("c1", "Kii"))
        }]);
        delivered.status = OrderStatus::Delivered;
        assert_eq!(delivery_credits(&delivered, StoredTotalPolicy::Ignore).credits.len(), 1);
    }

    #[test]
    fn receipt_reports_items_that_credited_nothing() {
        let plan = delivery_credits(
            &order(vec![
                OrderLineItem {
                    total_quantity_kg: Some(1.8),
                    ..OrderLineItem::for_coffee(CoffeeRef::new("c-bed", "Bedecho"))
                },
                OrderLineItem {
                    large_bags: Some(5),
                    ..OrderLineItem::default()
                },
            ]),
            StoredTotalPolicy::Ignore,
        );
        assert!(plan.is_partial());

        let receipt = plan.into_receipt(OrderId::new("o1"), OrderStatus::Shipped);
        assert!(receipt.is_partial());
        assert_eq!(receipt.total, Weight::ZERO);
        assert_eq!(receipt.skipped.len(), 1);
        assert_eq!(receipt.skipped[0].item_index, 1);
        assert_eq!(receipt.flagged.len(), 1);
        assert_eq!(receipt.flagged[0].item_index, 0);
        assert_eq!(receipt.flagged[0].stored_total.kg(), 1.8);
    }

    #[test]
    fn deliverable_statuses() {
        let id = OrderId::new("o1");
        assert!(ensure_deliverable(&id, OrderStatus::Pending).is_ok());
        assert!(ensure_deliverable(&id, OrderStatus::Shipped).is_ok());
        assert_eq!(
            ensure_deliverable(&id, OrderStatus::Delivered),
            Err(InventoryError::AlreadyDelivered(id.clone()))
        );
        assert!(matches!(
            ensure_deliverable(&id, OrderStatus::Cancelled),
            Err(InventoryError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn stock_apply_accumulates() {
        let mut stock = ShopStock::default();
        let credit = InventoryCredit {
            shop_id: ShopId::new("s1"),
            coffee_id: CoffeeId::new("c1"),
            small_bags_espresso: 3,
            small_bags_filter: 1,
            medium_bags_espresso: 0,
            medium_bags_filter: 0,
            large_bags: 2,
            total: Weight::from_grams(2800),
        };
        let now = Utc::now();
        stock.apply(&credit, now);
        stock.apply(&credit, now);
        assert_eq!(stock.small_bags_espresso, 6);
        assert_eq!(stock.total.grams(), 5600);
        assert_eq!(stock.updated_at, Some(now));
    }
}
