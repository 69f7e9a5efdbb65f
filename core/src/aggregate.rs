//! Cross-order aggregator.
//!
//! [`aggregate_orders`] folds raw orders into per-key [`AggregateBucket`]s in a
//! single pass. It is the only way to produce a bucket from order data, and it
//! only accepts orders: there is no entry point that takes buckets back in, so
//! a line item cannot be counted by two overlapping passes that are then
//! summed.
//!
//! Grand totals and shop subtotals are folded from the finished keyed buckets,
//! never from the orders again. Weights are integer grams, so
//! `sum(bucket.total) == grand_total.total` holds exactly.

use crate::error::EngineError;
use crate::normalize::{NormalizedItem, StoredTotalPolicy, normalize_line_item};
use crate::types::{CoffeeId, CoffeeRef, Order, OrderId, OrderStatus, ShopId, ShopRef};
use crate::weight::{StoredKg, Weight};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How line items are grouped into buckets.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// One bucket per coffee, across all shops
    #[default]
    CoffeeOnly,
    /// One bucket per coffee per shop
    CoffeePlusShop,
    /// One bucket per coffee and grade, across all shops
    CoffeePlusGrade,
}

impl KeyStrategy {
    /// Query-string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CoffeeOnly => "coffee",
            Self::CoffeePlusShop => "coffee_shop",
            Self::CoffeePlusGrade => "coffee_grade",
        }
    }

    /// Computes the grouping key for an item of `coffee` ordered by `shop`.
    #[must_use]
    pub fn key_for(self, coffee: &CoffeeRef, shop: &ShopRef) -> AggregationKey {
        match self {
            Self::CoffeeOnly => AggregationKey::Coffee {
                coffee_id: coffee.id.clone(),
            },
            Self::CoffeePlusShop => AggregationKey::CoffeeShop {
                coffee_id: coffee.id.clone(),
                shop_id: shop.id.clone(),
            },
            Self::CoffeePlusGrade => AggregationKey::CoffeeGrade {
                coffee_id: coffee.id.clone(),
                grade: coffee.grade.clone(),
            },
        }
    }

    const fn keys_by_shop(self) -> bool {
        matches!(self, Self::CoffeePlusShop)
    }

    /// Coffee label for a bucket. The grade is only kept when it is part of
    /// the key; otherwise a bucket mixing grades would carry whichever came
    /// first.
    fn label_for(self, coffee: &CoffeeRef) -> CoffeeRef {
        let mut label = coffee.clone();
        if !matches!(self, Self::CoffeePlusGrade) {
            label.grade = None;
        }
        label
    }
}

impl FromStr for KeyStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coffee" => Ok(Self::CoffeeOnly),
            "coffee_shop" => Ok(Self::CoffeePlusShop),
            "coffee_grade" => Ok(Self::CoffeePlusGrade),
            other => Err(EngineError::UnknownKeyStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping key. Components are kept as typed fields rather than joined into
/// a string, so distinct groups can never collide.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationKey {
    /// Coffee alone
    Coffee {
        /// Coffee
        coffee_id: CoffeeId,
    },
    /// Coffee within one shop
    CoffeeShop {
        /// Coffee
        coffee_id: CoffeeId,
        /// Shop
        shop_id: ShopId,
    },
    /// Coffee and grade
    CoffeeGrade {
        /// Coffee
        coffee_id: CoffeeId,
        /// Grade, `None` for ungraded coffee
        grade: Option<String>,
    },
}

impl AggregationKey {
    /// The coffee component, present in every key shape.
    #[must_use]
    pub const fn coffee_id(&self) -> &CoffeeId {
        match self {
            Self::Coffee { coffee_id }
            | Self::CoffeeShop { coffee_id, .. }
            | Self::CoffeeGrade { coffee_id, .. } => coffee_id,
        }
    }
}

/// Which orders take part in an aggregation pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    /// Orders with exactly this status
    Exact(OrderStatus),
    /// Orders not yet delivered or cancelled
    NonTerminal,
    /// Every order
    Any,
}

impl StatusFilter {
    /// Whether an order with `status` passes the filter.
    #[must_use]
    pub const fn matches(&self, status: OrderStatus) -> bool {
        match self {
            Self::Exact(wanted) => *wanted as u8 == status as u8,
            Self::NonTerminal => !status.is_terminal(),
            Self::Any => true,
        }
    }
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self::Exact(OrderStatus::Pending)
    }
}

impl FromStr for StatusFilter {
    type Err = EngineError;

    /// `open` selects non-terminal orders, `all` every order, anything else is
    /// parsed as a status name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::NonTerminal),
            "all" => Ok(Self::Any),
            _ => OrderStatus::parse(s).map(Self::Exact),
        }
    }
}

/// Options for one aggregation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationOptions {
    /// Which orders to include (default: `PENDING` only)
    pub status_filter: StatusFilter,
    /// How to group items
    pub key_strategy: KeyStrategy,
    /// Break every bucket down by shop and compute per-shop subtotals
    pub include_shop_breakdown: bool,
    /// Treatment of stored totals on items without bag counts
    pub stored_total_policy: StoredTotalPolicy,
}

impl AggregationOptions {
    /// Pending orders, grouped by coffee, no shop breakdown, stored totals ignored.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status filter.
    #[must_use]
    pub const fn with_status_filter(mut self, status_filter: StatusFilter) -> Self {
        self.status_filter = status_filter;
        self
    }

    /// Sets the key strategy.
    #[must_use]
    pub const fn with_key_strategy(mut self, key_strategy: KeyStrategy) -> Self {
        self.key_strategy = key_strategy;
        self
    }

    /// Enables or disables the per-shop breakdown.
    #[must_use]
    pub const fn with_shop_breakdown(mut self, include: bool) -> Self {
        self.include_shop_breakdown = include;
        self
    }

    /// Sets the stored-total policy.
    #[must_use]
    pub const fn with_stored_total_policy(mut self, policy: StoredTotalPolicy) -> Self {
        self.stored_total_policy = policy;
        self
    }
}

/// Running totals for a group of line items.
///
/// `small_bags` is always `small_bags_espresso + small_bags_filter`; it is
/// recomputed on every addition rather than counted on its own.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateBucket {
    /// Line items folded in
    pub items: u64,
    /// 200g espresso bags
    pub small_bags_espresso: u64,
    /// 200g filter bags
    pub small_bags_filter: u64,
    /// All 200g bags
    pub small_bags: u64,
    /// 500g espresso bags
    pub medium_bags_espresso: u64,
    /// 500g filter bags
    pub medium_bags_filter: u64,
    /// 1kg bags
    pub large_bags: u64,
    /// Total weight
    #[serde(rename = "total_kg")]
    pub total: Weight,
    /// Small espresso bag weight
    #[serde(rename = "espresso_kg")]
    pub espresso: Weight,
    /// Small filter bag weight
    #[serde(rename = "filter_kg")]
    pub filter: Weight,
    /// Medium bag weight
    #[serde(rename = "medium_kg")]
    pub medium: Weight,
    /// Large bag weight
    #[serde(rename = "large_kg")]
    pub large: Weight,
    /// Stored totals admitted by [`StoredTotalPolicy::FallbackToStored`]
    #[serde(rename = "unattributed_kg")]
    pub unattributed: Weight,
}

impl AggregateBucket {
    /// Adds one normalized item.
    pub fn add_item(&mut self, item: &NormalizedItem, policy: StoredTotalPolicy) {
        self.items += 1;
        self.small_bags_espresso += u64::from(item.espresso_bags_small);
        self.small_bags_filter += u64::from(item.filter_bags_small);
        self.medium_bags_espresso += u64::from(item.espresso_bags_medium);
        self.medium_bags_filter += u64::from(item.filter_bags_medium);
        self.large_bags += u64::from(item.large_bags);
        self.espresso += item.espresso_weight();
        self.filter += item.filter_weight();
        self.medium += item.medium_weight();
        self.large += item.large_weight();
        self.unattributed += item.unattributed_weight(policy);
        self.total += item.resolve_weight(policy);
        self.small_bags = self.small_bags_espresso + self.small_bags_filter;
    }

    /// Adds another bucket's totals into this one.
    pub fn merge(&mut self, other: &Self) {
        self.items += other.items;
        self.small_bags_espresso += other.small_bags_espresso;
        self.small_bags_filter += other.small_bags_filter;
        self.medium_bags_espresso += other.medium_bags_espresso;
        self.medium_bags_filter += other.medium_bags_filter;
        self.large_bags += other.large_bags;
        self.espresso += other.espresso;
        self.filter += other.filter;
        self.medium += other.medium;
        self.large += other.large;
        self.unattributed += other.unattributed;
        self.total += other.total;
        self.small_bags = self.small_bags_espresso + self.small_bags_filter;
    }

    /// Total weight in kilograms.
    #[must_use]
    pub fn total_kg(&self) -> f64 {
        self.total.kg()
    }

    /// Medium bags of both kinds.
    #[must_use]
    pub const fn medium_bags(&self) -> u64 {
        self.medium_bags_espresso + self.medium_bags_filter
    }
}

/// One shop's share of a bucket, or one shop's subtotal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopShare {
    /// The shop
    pub shop: ShopRef,
    /// Its totals
    pub totals: AggregateBucket,
}

/// A bucket with its key and display labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedBucket {
    /// Grouping key
    pub key: AggregationKey,
    /// Coffee, as first seen in this pass. `grade` is only set for
    /// [`KeyStrategy::CoffeePlusGrade`].
    pub coffee: CoffeeRef,
    /// Shop, for keys that include one
    pub shop: Option<ShopRef>,
    /// Totals
    pub totals: AggregateBucket,
    /// Per-shop breakdown sorted by shop name, when requested
    pub shops: Option<Vec<ShopShare>>,
}

impl KeyedBucket {
    fn sort_key(&self, shop_first: bool) -> (&str, &str, &str, &str, &AggregationKey) {
        let shop_name = self.shop.as_ref().map_or("", |s| s.name.as_str());
        let grade = self.coffee.grade.as_deref().unwrap_or("");
        let lead = if shop_first { shop_name } else { "" };
        (lead, self.coffee.name.as_str(), shop_name, grade, &self.key)
    }
}

/// Why a line item was left out.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The item has no coffee reference
    MissingCoffee,
}

/// A line item left out of the totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    /// Owning order
    pub order_id: OrderId,
    /// Position within the order
    pub item_index: usize,
    /// Reason
    pub reason: SkipReason,
}

/// A line item whose bag counts are zero but whose stored total is not.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedItem {
    /// Owning order
    pub order_id: OrderId,
    /// Position within the order
    pub item_index: usize,
    /// Coffee
    pub coffee_id: CoffeeId,
    /// The stored total, exactly as persisted
    #[serde(rename = "stored_total_kg")]
    pub stored_total: StoredKg,
    /// Weight the item was counted for under `policy`
    #[serde(rename = "counted_kg")]
    pub counted: Weight,
    /// Policy applied to it
    pub policy: StoredTotalPolicy,
}

/// Result of one aggregation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationReport {
    /// Keyed buckets in display order
    pub buckets: Vec<KeyedBucket>,
    /// Sum of every bucket
    pub grand_total: AggregateBucket,
    /// Per-shop subtotals sorted by shop name, when requested
    pub shop_subtotals: Option<Vec<ShopShare>>,
    /// Items left out
    pub skipped: Vec<SkippedItem>,
    /// Items with a stored total but no bag counts
    pub flagged: Vec<FlaggedItem>,
    /// Orders that passed the status filter
    pub orders_considered: usize,
    /// Line items visited across those orders
    pub items_visited: usize,
}

impl AggregationReport {
    /// Some items were skipped or flagged.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty() || !self.flagged.is_empty()
    }

    /// Bucket for `key`, if any item landed in it.
    #[must_use]
    pub fn bucket(&self, key: &AggregationKey) -> Option<&KeyedBucket> {
        self.buckets.iter().find(|b| &b.key == key)
    }

    /// Subtotal for one shop.
    #[must_use]
    pub fn shop_subtotal(&self, shop_id: &ShopId) -> Option<&AggregateBucket> {
        self.shop_subtotals
            .as_ref()?
            .iter()
            .find(|s| &s.shop.id == shop_id)
            .map(|s| &s.totals)
    }
}

type ShopSlot = (String, ShopId);

struct Accumulator {
    coffee: CoffeeRef,
    shop: Option<ShopRef>,
    totals: AggregateBucket,
    shops: BTreeMap<ShopSlot, ShopShare>,
}

fn shop_slot(shop: &ShopRef) -> ShopSlot {
    (shop.name.clone(), shop.id.clone())
}

fn add_to_shop(shops: &mut BTreeMap<ShopSlot, ShopShare>, share: &ShopShare) {
    shops
        .entry(shop_slot(&share.shop))
        .or_insert_with(|| ShopShare {
            shop: share.shop.clone(),
            totals: AggregateBucket::default(),
        })
        .totals
        .merge(&share.totals);
}

/// Fold `orders` into keyed buckets.
///
/// Orders failing `options.status_filter` are ignored. Every line item of the
/// remaining orders is visited exactly once: items without a coffee are
/// skipped and listed in [`AggregationReport::skipped`]; items with a stored
/// total but no bag counts are listed in [`AggregationReport::flagged`] and
/// counted per `options.stored_total_policy`.
///
/// Pure and deterministic: the same input always yields the same report.
#[must_use]
pub fn aggregate_orders(orders: &[Order], options: &AggregationOptions) -> AggregationReport {
    let policy = options.stored_total_policy;
    let mut report = AggregationReport::default();
    let mut accumulators: BTreeMap<AggregationKey, Accumulator> = BTreeMap::new();

    for order in orders.iter().filter(|o| options.status_filter.matches(o.status)) {
        report.orders_considered += 1;

        for (item_index, item) in order.items.iter().enumerate() {
            report.items_visited += 1;

            let Some(coffee) = item.coffee.as_ref() else {
                tracing::warn!(
                    order_id = %order.id,
                    item_index,
                    "Skipping line item without a coffee reference"
                );
                report.skipped.push(SkippedItem {
                    order_id: order.id.clone(),
                    item_index,
                    reason: SkipReason::MissingCoffee,
                });
                continue;
            };

            let normalized = normalize_line_item(item);
            if let (true, Some(stored_total)) = (normalized.is_ambiguous(), normalized.stored_total) {
                tracing::warn!(
                    order_id = %order.id,
                    item_index,
                    coffee_id = %coffee.id,
                    stored_kg = stored_total.kg(),
                    counted_kg = normalized.resolve_weight(policy).kg(),
                    policy = ?policy,
                    "Line item has a stored total but no bag counts"
                );
                report.flagged.push(FlaggedItem {
                    order_id: order.id.clone(),
                    item_index,
                    coffee_id: coffee.id.clone(),
                    stored_total,
                    counted: normalized.resolve_weight(policy),
                    policy,
                });
            }

            let key = options.key_strategy.key_for(coffee, &order.shop);
            let acc = accumulators.entry(key).or_insert_with(|| Accumulator {
                coffee: options.key_strategy.label_for(coffee),
                shop: options.key_strategy.keys_by_shop().then(|| order.shop.clone()),
                totals: AggregateBucket::default(),
                shops: BTreeMap::new(),
            });
            acc.totals.add_item(&normalized, policy);

            if options.include_shop_breakdown {
                acc.shops
                    .entry(shop_slot(&order.shop))
                    .or_insert_with(|| ShopShare {
                        shop: order.shop.clone(),
                        totals: AggregateBucket::default(),
                    })
                    .totals
                    .add_item(&normalized, policy);
            }
        }
    }

    let mut buckets: Vec<KeyedBucket> = accumulators
        .into_iter()
        .map(|(key, acc)| KeyedBucket {
            key,
            coffee: acc.coffee,
            shop: acc.shop,
            totals: acc.totals,
            shops: options
                .include_shop_breakdown
                .then(|| acc.shops.into_values().collect()),
        })
        .collect();
    let shop_first = options.include_shop_breakdown;
    buckets.sort_by(|a, b| a.sort_key(shop_first).cmp(&b.sort_key(shop_first)));

    for bucket in &buckets {
        report.grand_total.merge(&bucket.totals);
    }

    if options.include_shop_breakdown {
        let mut subtotals = BTreeMap::new();
        for share in buckets.iter().flat_map(|b| b.shops.iter().flatten()) {
            add_to_shop(&mut subtotals, share);
        }
        report.shop_subtotals = Some(subtotals.into_values().collect());
    }

    report.buckets = buckets;

    tracing::debug!(
        orders = report.orders_considered,
        items = report.items_visited,
        buckets = report.buckets.len(),
        skipped = report.skipped.len(),
        flagged = report.flagged.len(),
        total_kg = report.grand_total.total_kg(),
        key_strategy = %options.key_strategy,
        "Aggregated orders"
    );

    report
}
