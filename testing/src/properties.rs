//! proptest strategies for engine inputs
//!
//! Generated data deliberately includes the messy shapes found in production
//! rows: null counts, negative counts, legacy and split counts on the same
//! row, stored totals that disagree with the counts, and missing coffees.

use bean_route_core::{CoffeeRef, Order, OrderId, OrderLineItem, OrderStatus, ShopRef};
use proptest::collection::vec;
use proptest::prelude::*;

/// A nullable count column, occasionally negative.
pub fn arb_count() -> impl Strategy<Value = Option<i32>> {
    prop_oneof![
        2 => Just(None),
        1 => Just(Some(0)),
        6 => (1..40i32).prop_map(Some),
        1 => (-5..0i32).prop_map(Some),
    ]
}

/// One of a small fixed set of coffees, so buckets actually collide.
pub fn arb_coffee() -> impl Strategy<Value = CoffeeRef> {
    (0..4usize, prop::option::of(0..2usize)).prop_map(|(n, grade)| {
        let names = ["Bedecho", "Kii", "Kochere", "La Esperanza"];
        let coffee = CoffeeRef::new(format!("coffee-{n}"), names[n]);
        match grade {
            Some(g) => coffee.with_grade(format!("G{}", g + 1)),
            None => coffee,
        }
    })
}

/// One of a small fixed set of shops.
pub fn arb_shop() -> impl Strategy<Value = ShopRef> {
    (0..3usize).prop_map(|n| {
        let names = ["Harbour St", "Market Lane", "Station Kiosk"];
        ShopRef::new(format!("shop-{n}"), names[n])
    })
}

/// Any status.
pub fn arb_status() -> impl Strategy<Value = OrderStatus> {
    prop::sample::select(OrderStatus::ALL.to_vec())
}

/// Generate a persisted `total_quantity_kg`, including the values a
/// careless writer leaves behind: negative, NaN and under half a gram.
pub fn arb_stored_kg() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => Just(0.0),
        8 => 0.2..20.0f64,
        1 => -20.0..0.0f64,
        1 => 0.0..0.0005f64,
        1 => Just(f64::NAN),
    ]
}

/// A line item, with a missing coffee about one time in twenty.
pub fn arb_line_item() -> impl Strategy<Value = OrderLineItem> {
    (
        prop::option::weighted(0.95, arb_coffee()),
        (arb_count(), arb_count(), arb_count()),
        (arb_count(), arb_count(), arb_count()),
        prop::option::of(arb_stored_kg()),
    )
        .prop_map(
            |(coffee, (legacy, espresso, filter), (medium_espresso, medium_filter, large), stored)| {
                OrderLineItem {
                    coffee,
                    small_bags_legacy: legacy,
                    small_bags_espresso: espresso,
                    small_bags_filter: filter,
                    medium_bags_espresso: medium_espresso,
                    medium_bags_filter: medium_filter,
                    large_bags: large,
                    total_quantity_kg: stored,
                }
            },
        )
}

/// An order with up to six items.
pub fn arb_order() -> impl Strategy<Value = Order> {
    (
        "[a-z0-9]{6}",
        arb_status(),
        arb_shop(),
        vec(arb_line_item(), 0..6),
    )
        .prop_map(|(id, status, shop, items)| Order {
            id: OrderId::new(format!("order-{id}")),
            status,
            shop,
            items,
        })
}

/// Up to twenty orders.
pub fn arb_orders() -> impl Strategy<Value = Vec<Order>> {
    vec(arb_order(), 0..20)
}
