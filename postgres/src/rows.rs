//! Row types and the queries shared by the order source and the ledger.

use bean_route_core::{
    CoffeeRef, Order, OrderId, OrderLineItem, OrderStatus, ShopRef, SourceError,
};
use sqlx::PgExecutor;
use std::collections::HashMap;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OrderRow {
    pub id: String,
    pub status: String,
    pub shop_id: String,
    pub shop_name: String,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ItemRow {
    pub order_id: String,
    pub coffee_id: Option<String>,
    pub coffee_name: Option<String>,
    pub coffee_grade: Option<String>,
    pub small_bags_legacy: Option<i32>,
    pub small_bags_espresso: Option<i32>,
    pub small_bags_filter: Option<i32>,
    pub medium_bags_espresso: Option<i32>,
    pub medium_bags_filter: Option<i32>,
    pub large_bags: Option<i32>,
    pub total_quantity_kg: Option<f64>,
}

impl ItemRow {
    fn into_line_item(self) -> OrderLineItem {
        // A null name means the LEFT JOIN found no coffee for the id.
        let coffee = match (self.coffee_id, self.coffee_name) {
            (Some(id), Some(name)) => {
                let coffee = CoffeeRef::new(id, name);
                Some(match self.coffee_grade {
                    Some(grade) => coffee.with_grade(grade),
                    None => coffee,
                })
            }
            _ => None,
        };

        OrderLineItem {
            coffee,
            small_bags_legacy: self.small_bags_legacy,
            small_bags_espresso: self.small_bags_espresso,
            small_bags_filter: self.small_bags_filter,
            medium_bags_espresso: self.medium_bags_espresso,
            medium_bags_filter: self.medium_bags_filter,
            large_bags: self.large_bags,
            total_quantity_kg: self.total_quantity_kg,
        }
    }
}

pub(crate) const ORDER_COLUMNS: &str = r"
    SELECT o.id, o.status, s.id AS shop_id, s.name AS shop_name
    FROM orders o
    JOIN shops s ON s.id = o.shop_id
";

/// Line items of `order_ids`, coffee joined, in position order.
pub(crate) async fn fetch_items<'e, E: PgExecutor<'e>>(
    executor: E,
    order_ids: &[String],
) -> Result<Vec<ItemRow>, sqlx::Error> {
    sqlx::query_as::<_, ItemRow>(
        r"
        SELECT
            i.order_id,
            i.coffee_id,
            c.name AS coffee_name,
            c.grade AS coffee_grade,
            i.small_bags_legacy,
            i.small_bags_espresso,
            i.small_bags_filter,
            i.medium_bags_espresso,
            i.medium_bags_filter,
            i.large_bags,
            i.total_quantity_kg
        FROM order_items i
        LEFT JOIN coffees c ON c.id = i.coffee_id
        WHERE i.order_id = ANY($1)
        ORDER BY i.order_id, i.position, i.id
        ",
    )
    .bind(order_ids)
    .fetch_all(executor)
    .await
}

/// Parse a persisted status column.
pub(crate) fn parse_status(order_id: &str, status: &str) -> Result<OrderStatus, SourceError> {
    OrderStatus::parse(status).map_err(|_| {
        SourceError::MalformedRow(format!("order {order_id} has unknown status {status:?}"))
    })
}

/// Attach item rows to their order rows, keeping the order rows' order.
pub(crate) fn assemble(
    orders: Vec<OrderRow>,
    items: Vec<ItemRow>,
) -> Result<Vec<Order>, SourceError> {
    let mut by_order: HashMap<String, Vec<OrderLineItem>> = HashMap::new();
    for item in items {
        by_order
            .entry(item.order_id.clone())
            .or_default()
            .push(item.into_line_item());
    }

    orders
        .into_iter()
        .map(|row| {
            let status = parse_status(&row.id, &row.status)?;
            let items = by_order.remove(&row.id).unwrap_or_default();
            Ok(Order {
                id: OrderId::new(row.id),
                status,
                shop: ShopRef::new(row.shop_id, row.shop_name),
                items,
            })
        })
        .collect()
}
