//! Fluent builders for orders and line items
//!
//! Keeps fixtures readable when a test only cares about one or two columns.

use bean_route_core::{CoffeeRef, Order, OrderId, OrderLineItem, OrderStatus, ShopRef};

/// Builder for a single [`OrderLineItem`]
///
/// # Example
///
/// ```
/// use bean_route_testing::LineItemBuilder;
///
/// let item = LineItemBuilder::new("c1", "Bedecho")
///     .split_small(3, 2)
///     .large(1)
///     .build();
/// assert_eq!(item.small_bags_espresso, Some(3));
/// assert_eq!(item.small_bags_legacy, None);
/// ```
#[derive(Clone, Debug)]
pub struct LineItemBuilder {
    item: OrderLineItem,
}

impl LineItemBuilder {
    /// Item for a coffee
    #[must_use]
    pub fn new(coffee_id: &str, coffee_name: &str) -> Self {
        Self::for_coffee(CoffeeRef::new(coffee_id, coffee_name))
    }

    /// Item for an existing coffee reference
    #[must_use]
    pub fn for_coffee(coffee: CoffeeRef) -> Self {
        Self {
            item: OrderLineItem::for_coffee(coffee),
        }
    }

    /// Item whose coffee reference is missing
    #[must_use]
    pub fn orphan() -> Self {
        Self {
            item: OrderLineItem::default(),
        }
    }

    /// Pre-split small bag count
    #[must_use]
    pub const fn legacy_small(mut self, count: i32) -> Self {
        self.item.small_bags_legacy = Some(count);
        self
    }

    /// Split small bag counts
    #[must_use]
    pub const fn split_small(mut self, espresso: i32, filter: i32) -> Self {
        self.item.small_bags_espresso = Some(espresso);
        self.item.small_bags_filter = Some(filter);
        self
    }

    /// Medium bag counts
    #[must_use]
    pub const fn medium(mut self, espresso: i32, filter: i32) -> Self {
        self.item.medium_bags_espresso = Some(espresso);
        self.item.medium_bags_filter = Some(filter);
        self
    }

    /// Large bag count
    #[must_use]
    pub const fn large(mut self, count: i32) -> Self {
        self.item.large_bags = Some(count);
        self
    }

    /// Stored `total_quantity_kg`
    #[must_use]
    pub const fn stored_kg(mut self, kg: f64) -> Self {
        self.item.total_quantity_kg = Some(kg);
        self
    }

    /// Finish
    #[must_use]
    pub fn build(self) -> OrderLineItem {
        self.item
    }
}

/// Builder for an [`Order`]
///
/// Defaults to a `PENDING` order from shop `shop-1` ("Harbour St").
///
/// # Example
///
/// ```
/// use bean_route_core::OrderStatus;
/// use bean_route_testing::OrderBuilder;
///
/// let order = OrderBuilder::new("o1")
///     .shop("s2", "Market Lane")
///     .status(OrderStatus::Confirmed)
///     .split_small("c1", "Bedecho", 3, 2)
///     .build();
/// assert_eq!(order.items.len(), 1);
/// assert_eq!(order.shop.name, "Market Lane");
/// ```
#[derive(Clone, Debug)]
pub struct OrderBuilder {
    order: Order,
}

impl OrderBuilder {
    /// Pending order with no items
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            order: Order {
                id: OrderId::new(id),
                status: OrderStatus::Pending,
                shop: ShopRef::new("shop-1", "Harbour St"),
                items: Vec::new(),
            },
        }
    }

    /// Set the status
    #[must_use]
    pub const fn status(mut self, status: OrderStatus) -> Self {
        self.order.status = status;
        self
    }

    /// Set the shop
    #[must_use]
    pub fn shop(mut self, id: &str, name: &str) -> Self {
        self.order.shop = ShopRef::new(id, name);
        self
    }

    /// Append a line item
    #[must_use]
    pub fn item(mut self, item: OrderLineItem) -> Self {
        self.order.items.push(item);
        self
    }

    /// Append an item with only a pre-split small bag count
    #[must_use]
    pub fn legacy_small(self, coffee_id: &str, coffee_name: &str, count: i32) -> Self {
        self.item(LineItemBuilder::new(coffee_id, coffee_name).legacy_small(count).build())
    }

    /// Append an item with only split small bag counts
    #[must_use]
    pub fn split_small(self, coffee_id: &str, coffee_name: &str, espresso: i32, filter: i32) -> Self {
        self.item(
            LineItemBuilder::new(coffee_id, coffee_name)
                .split_small(espresso, filter)
                .build(),
        )
    }

    /// Finish
    #[must_use]
    pub fn build(self) -> Order {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orphan_has_no_coffee() {
        assert!(LineItemBuilder::orphan().large(2).build().coffee.is_none());
    }

    #[test]
    fn builder_defaults() {
        let order = OrderBuilder::new("o9").build();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.shop.id.as_str(), "shop-1");
        assert!(order.items.is_empty());
    }
}
