//! Scenario tests: reporting and delivery through the in-memory collaborators

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use bean_route_core::{
    AggregationKey, AggregationOptions, CoffeeId, EngineError, InventoryError, InventoryLedger,
    KeyStrategy, OrderId, OrderSource, OrderStatus, ShopId, SourceError, StatusFilter,
    StoredTotalPolicy, aggregate_orders, build_report,
};
use bean_route_testing::{
    FailingOrderSource, InMemoryOrderStore, LineItemBuilder, OrderBuilder, init_test_tracing,
};
use std::sync::Arc;

fn bedecho() -> AggregationKey {
    AggregationKey::Coffee {
        coffee_id: CoffeeId::new("bedecho"),
    }
}

#[test]
fn two_orders_of_bedecho_sum_to_3_6_kg() {
    let orders = vec![
        OrderBuilder::new("o1").legacy_small("bedecho", "Bedecho", 9).build(),
        OrderBuilder::new("o2").legacy_small("bedecho", "Bedecho", 9).build(),
    ];

    let report = aggregate_orders(&orders, &AggregationOptions::new());

    let bucket = report.bucket(&bedecho()).expect("bedecho bucket");
    assert_eq!(bucket.totals.total_kg(), 3.6);
    assert_eq!(bucket.totals.items, 2);
    assert_eq!(report.grand_total.total_kg(), 3.6);
    assert!(!report.is_partial());
}

#[test]
fn stored_total_without_bags_is_flagged_not_hidden() {
    init_test_tracing();
    let order = OrderBuilder::new("o1")
        .item(
            LineItemBuilder::new("bedecho", "Bedecho")
                .legacy_small(0)
                .split_small(0, 0)
                .medium(0, 0)
                .large(0)
                .stored_kg(1.8)
                .build(),
        )
        .build();

    let ignored = aggregate_orders(std::slice::from_ref(&order), &AggregationOptions::new());
    assert!(ignored.is_partial());
    assert_eq!(ignored.flagged.len(), 1);
    assert_eq!(ignored.flagged[0].stored_total.kg(), 1.8);
    assert_eq!(ignored.flagged[0].policy, StoredTotalPolicy::Ignore);
    assert_eq!(ignored.grand_total.total_kg(), 0.0);

    let fallback = aggregate_orders(
        &[order],
        &AggregationOptions::new().with_stored_total_policy(StoredTotalPolicy::FallbackToStored),
    );
    assert_eq!(fallback.flagged.len(), 1);
    assert_eq!(fallback.grand_total.total_kg(), 1.8);
    assert_eq!(fallback.grand_total.unattributed.kg(), 1.8);
    assert_eq!(fallback.grand_total.small_bags, 0);
}

#[test]
fn coffee_only_bucket_equals_the_sum_of_shop_buckets() {
    let orders = vec![
        OrderBuilder::new("o1")
            .shop("s1", "Harbour St")
            .split_small("kii", "Kii", 2, 1)
            .build(),
        OrderBuilder::new("o2")
            .shop("s2", "Market Lane")
            .split_small("kii", "Kii", 1, 4)
            .build(),
    ];

    let coffee_only = aggregate_orders(&orders, &AggregationOptions::new());
    assert_eq!(coffee_only.buckets.len(), 1);

    let per_shop = aggregate_orders(
        &orders,
        &AggregationOptions::new().with_key_strategy(KeyStrategy::CoffeePlusShop),
    );
    assert_eq!(per_shop.buckets.len(), 2);

    let harbour = per_shop
        .bucket(&AggregationKey::CoffeeShop {
            coffee_id: CoffeeId::new("kii"),
            shop_id: ShopId::new("s1"),
        })
        .unwrap();
    let market = per_shop
        .bucket(&AggregationKey::CoffeeShop {
            coffee_id: CoffeeId::new("kii"),
            shop_id: ShopId::new("s2"),
        })
        .unwrap();
    assert_eq!(harbour.totals.total.grams() + market.totals.total.grams(), 1600);
    assert_eq!(coffee_only.buckets[0].totals.total.grams(), 1600);
    assert_eq!(coffee_only.buckets[0].totals.small_bags_filter, 5);
}

#[test]
fn all_zero_counts_weigh_exactly_zero() {
    let order = OrderBuilder::new("o1")
        .item(
            LineItemBuilder::new("kii", "Kii")
                .legacy_small(0)
                .split_small(0, 0)
                .medium(0, 0)
                .large(0)
                .build(),
        )
        .build();

    let report = aggregate_orders(&[order], &AggregationOptions::new());
    let kg = report.grand_total.total_kg();
    assert_eq!(kg, 0.0);
    assert!(kg.is_sign_positive());
    assert!(report.flagged.is_empty());
}

#[test]
fn missing_coffee_is_skipped_and_the_rest_counted() {
    init_test_tracing();
    let order = OrderBuilder::new("o1")
        .item(LineItemBuilder::orphan().large(3).build())
        .legacy_small("kii", "Kii", 5)
        .build();

    let report = aggregate_orders(&[order], &AggregationOptions::new());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].item_index, 0);
    assert_eq!(report.grand_total.total_kg(), 1.0);
    assert!(report.is_partial());
}

#[tokio::test]
async fn build_report_applies_the_status_filter() {
    let store = InMemoryOrderStore::with_orders([
        OrderBuilder::new("o1").legacy_small("kii", "Kii", 5).build(),
        OrderBuilder::new("o2")
            .status(OrderStatus::Shipped)
            .legacy_small("kii", "Kii", 5)
            .build(),
        OrderBuilder::new("o3")
            .status(OrderStatus::Delivered)
            .legacy_small("kii", "Kii", 5)
            .build(),
    ]);

    let pending = build_report(&store, &AggregationOptions::new()).await.unwrap();
    assert_eq!(pending.orders_considered, 1);

    let open = build_report(
        &store,
        &AggregationOptions::new().with_status_filter(StatusFilter::NonTerminal),
    )
    .await
    .unwrap();
    assert_eq!(open.orders_considered, 2);
    assert_eq!(open.grand_total.total_kg(), 2.0);
}

#[tokio::test]
async fn fetch_failure_reaches_the_caller_unchanged() {
    let source = FailingOrderSource::new(SourceError::Database("timeout".to_string()));

    let err = build_report(&source, &AggregationOptions::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Source(SourceError::Database("timeout".to_string()))
    );
}

#[tokio::test]
async fn delivery_credits_stock_and_marks_order_delivered() {
    let store = InMemoryOrderStore::with_orders([OrderBuilder::new("o1")
        .shop("s1", "Harbour St")
        .status(OrderStatus::Shipped)
        .split_small("kii", "Kii", 3, 2)
        .legacy_small("bedecho", "Bedecho", 9)
        .item(LineItemBuilder::new("kii", "Kii").medium(1, 0).large(1).build())
        .build()]);

    let receipt = store
        .credit_delivery(OrderId::new("o1"), StoredTotalPolicy::Ignore)
        .await
        .unwrap();

    assert_eq!(receipt.previous_status, OrderStatus::Shipped);
    assert_eq!(receipt.credits.len(), 2);
    assert_eq!(receipt.credits[0].coffee_id, CoffeeId::new("bedecho"));
    assert_eq!(receipt.total.grams(), 4300);

    let kii = store
        .stock(ShopId::new("s1"), CoffeeId::new("kii"))
        .await
        .unwrap()
        .expect("kii stock");
    assert_eq!(kii.small_bags_espresso, 3);
    assert_eq!(kii.small_bags_filter, 2);
    assert_eq!(kii.medium_bags_espresso, 1);
    assert_eq!(kii.large_bags, 1);
    assert_eq!(kii.total.grams(), 2500);
    assert!(kii.updated_at.is_some());

    let order = store
        .fetch_order(OrderId::new("o1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn delivery_reports_items_it_could_not_credit() {
    let store = InMemoryOrderStore::with_orders([OrderBuilder::new("o1")
        .status(OrderStatus::Shipped)
        .item(
            LineItemBuilder::new("bedecho", "Bedecho")
                .legacy_small(0)
                .stored_kg(1.8)
                .build(),
        )
        .item(LineItemBuilder::orphan().large(5).build())
        .build()]);

    let receipt = store
        .credit_delivery(OrderId::new("o1"), StoredTotalPolicy::Ignore)
        .await
        .unwrap();

    assert!(receipt.is_partial());
    assert_eq!(receipt.total.grams(), 0);
    assert_eq!(receipt.flagged.len(), 1);
    assert_eq!(receipt.flagged[0].item_index, 0);
    assert_eq!(receipt.flagged[0].stored_total.kg(), 1.8);
    assert_eq!(receipt.skipped.len(), 1);
    assert_eq!(receipt.skipped[0].item_index, 1);
    assert_eq!(
        store.order(&OrderId::new("o1")).unwrap().status,
        OrderStatus::Delivered
    );
}

#[tokio::test]
async fn complete_delivery_is_not_partial() {
    let store = InMemoryOrderStore::with_orders([OrderBuilder::new("o1")
        .legacy_small("kii", "Kii", 5)
        .build()]);

    let receipt = store
        .credit_delivery(OrderId::new("o1"), StoredTotalPolicy::Ignore)
        .await
        .unwrap();

    assert!(!receipt.is_partial());
    assert!(receipt.skipped.is_empty());
    assert!(receipt.flagged.is_empty());
}

#[tokio::test]
async fn second_delivery_is_rejected_without_crediting_again() {
    let store = InMemoryOrderStore::with_orders([OrderBuilder::new("o1")
        .legacy_small("kii", "Kii", 5)
        .build()]);
    let id = OrderId::new("o1");

    store
        .credit_delivery(id.clone(), StoredTotalPolicy::Ignore)
        .await
        .unwrap();
    let err = store
        .credit_delivery(id.clone(), StoredTotalPolicy::Ignore)
        .await
        .unwrap_err();
    assert_eq!(err, InventoryError::AlreadyDelivered(id));

    let stock = store
        .stock(ShopId::new("shop-1"), CoffeeId::new("kii"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stock.total.grams(), 1000);
}

#[tokio::test]
async fn cancelled_and_unknown_orders_are_not_delivered() {
    let store = InMemoryOrderStore::with_orders([OrderBuilder::new("o1")
        .status(OrderStatus::Cancelled)
        .legacy_small("kii", "Kii", 5)
        .build()]);

    let err = store
        .credit_delivery(OrderId::new("o1"), StoredTotalPolicy::Ignore)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InventoryError::InvalidTransition { from: OrderStatus::Cancelled, .. }
    ));

    let err = store
        .credit_delivery(OrderId::new("nope"), StoredTotalPolicy::Ignore)
        .await
        .unwrap_err();
    assert_eq!(err, InventoryError::OrderNotFound(OrderId::new("nope")));

    let stock = store
        .stock(ShopId::new("shop-1"), CoffeeId::new("kii"))
        .await
        .unwrap();
    assert!(stock.is_none());
}

#[tokio::test]
async fn concurrent_deliveries_credit_exactly_once() {
    let store = Arc::new(InMemoryOrderStore::with_orders([OrderBuilder::new("o1")
        .legacy_small("kii", "Kii", 5)
        .build()]));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .credit_delivery(OrderId::new("o1"), StoredTotalPolicy::Ignore)
                    .await
            })
        })
        .collect();

    let mut delivered = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => delivered += 1,
            Err(err) => assert!(matches!(err, InventoryError::AlreadyDelivered(_))),
        }
    }
    assert_eq!(delivered, 1);

    let stock = store
        .stock(ShopId::new("shop-1"), CoffeeId::new("kii"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stock.total.grams(), 1000);
}
