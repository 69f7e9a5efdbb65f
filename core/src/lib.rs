//! # Bean Route Core
//!
//! Order-to-inventory quantity reconciliation for the Bean Route roastery.
//!
//! Line items record quantities as bag counts in several historical shapes:
//! an undifferentiated small-bag count, later split into espresso and filter
//! bags, plus medium and large bags. This crate owns the one place those
//! shapes are turned into canonical quantities, and the one fold that sums
//! them across orders.
//!
//! ## Core Concepts
//!
//! - **Normalizer**: [`normalize_line_item`] maps a line item to canonical
//!   bag counts and a weight, with an explicit small-bag precedence rule
//! - **Aggregator**: [`aggregate_orders`] folds raw orders into keyed
//!   buckets plus a grand total, visiting each line item exactly once
//! - **Collaborators**: [`OrderSource`] fetches orders, [`InventoryLedger`]
//!   credits delivered orders into shop stock
//!
//! ## Architecture Principles
//!
//! - Pure core: normalizer and aggregator do no I/O and never fail
//! - Integer grams internally, kilograms only at the edges
//! - Ambiguous data is reported, never silently zeroed
//!
//! ## Example
//!
//! ```
//! use bean_route_core::{
//!     AggregationOptions, CoffeeRef, Order, OrderId, OrderLineItem, OrderStatus, ShopRef,
//!     aggregate_orders,
//! };
//!
//! let order = Order {
//!     id: OrderId::new("order-1"),
//!     status: OrderStatus::Pending,
//!     shop: ShopRef::new("shop-1", "Harbour St"),
//!     items: vec![OrderLineItem {
//!         small_bags_legacy: Some(9),
//!         ..OrderLineItem::for_coffee(CoffeeRef::new("coffee-1", "Bedecho"))
//!     }],
//! };
//!
//! let report = aggregate_orders(&[order], &AggregationOptions::new());
//! assert_eq!(report.grand_total.total_kg(), 1.8);
//! assert_eq!(report.grand_total.small_bags_espresso, 9);
//! ```

pub mod aggregate;
pub mod error;
pub mod inventory;
pub mod normalize;
pub mod source;
pub mod types;
pub mod weight;

pub use aggregate::{
    AggregateBucket, AggregationKey, AggregationOptions, AggregationReport, FlaggedItem,
    KeyStrategy, KeyedBucket, ShopShare, SkipReason, SkippedItem, StatusFilter, aggregate_orders,
};
pub use error::{EngineError, InventoryError, Result, SourceError};
pub use inventory::{
    DeliveryPlan, DeliveryReceipt, InventoryCredit, InventoryLedger, ShopStock, delivery_credits,
    ensure_deliverable,
};
pub use normalize::{NormalizedItem, SmallBagSource, StoredTotalPolicy, normalize_line_item};
pub use source::{OrderSource, build_report};
pub use types::{CoffeeId, CoffeeRef, Order, OrderId, OrderLineItem, OrderStatus, ShopId, ShopRef};
pub use weight::{BagSize, LARGE_BAG, MEDIUM_BAG, SMALL_BAG, StoredKg, Weight};

// Re-exported so collaborator implementations name the same future type.
pub use futures::future::BoxFuture;
