//! Transactional shop inventory ledger.

use crate::rows::{self, ORDER_COLUMNS, OrderRow};
use bean_route_core::{
    BoxFuture, CoffeeId, DeliveryReceipt, InventoryCredit, InventoryError, InventoryLedger,
    OrderId, OrderStatus, ShopId, ShopStock, StoredTotalPolicy, Weight, delivery_credits,
    ensure_deliverable,
};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

#[derive(Debug, sqlx::FromRow)]
struct StockRow {
    small_bags_espresso: i64,
    small_bags_filter: i64,
    medium_bags_espresso: i64,
    medium_bags_filter: i64,
    large_bags: i64,
    total_grams: i64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StockRow> for ShopStock {
    type Error = InventoryError;

    fn try_from(row: StockRow) -> Result<Self, Self::Error> {
        let count = |value: i64, column: &str| {
            u64::try_from(value)
                .map_err(|_| InventoryError::Storage(format!("Negative {column}: {value}")))
        };
        Ok(Self {
            small_bags_espresso: count(row.small_bags_espresso, "small_bags_espresso")?,
            small_bags_filter: count(row.small_bags_filter, "small_bags_filter")?,
            medium_bags_espresso: count(row.medium_bags_espresso, "medium_bags_espresso")?,
            medium_bags_filter: count(row.medium_bags_filter, "medium_bags_filter")?,
            large_bags: count(row.large_bags, "large_bags")?,
            total: Weight::from_grams(count(row.total_grams, "total_grams")?),
            updated_at: Some(row.updated_at),
        })
    }
}

fn column(value: u64) -> Result<i64, InventoryError> {
    i64::try_from(value).map_err(|_| InventoryError::Storage(format!("Count overflow: {value}")))
}

/// Credits delivered orders into `shop_inventory`.
///
/// Each delivery is one transaction. The order row is locked with
/// `SELECT ... FOR UPDATE` before its status is checked, so two concurrent
/// deliveries of the same order serialize and the second sees `DELIVERED`.
/// Inventory rows are upserted in coffee-id order, which keeps the lock
/// order identical across transactions.
#[derive(Clone, Debug)]
pub struct PostgresInventoryLedger {
    pool: PgPool,
}

impl PostgresInventoryLedger {
    /// Create a ledger over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn credit(
        &self,
        order_id: OrderId,
        policy: StoredTotalPolicy,
    ) -> Result<DeliveryReceipt, InventoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| InventoryError::Storage(format!("Failed to start transaction: {e}")))?;

        let Some(row) = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_COLUMNS} WHERE o.id = $1 FOR UPDATE OF o"
        ))
        .bind(order_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| InventoryError::Storage(format!("Failed to lock order: {e}")))?
        else {
            rollback(tx, &order_id).await;
            return Err(InventoryError::OrderNotFound(order_id));
        };

        let status = rows::parse_status(&row.id, &row.status)
            .map_err(|e| InventoryError::Storage(e.to_string()))?;
        if let Err(e) = ensure_deliverable(&order_id, status) {
            rollback(tx, &order_id).await;
            return Err(e);
        }

        let items = rows::fetch_items(&mut *tx, &[row.id.clone()])
            .await
            .map_err(|e| InventoryError::Storage(format!("Failed to load order items: {e}")))?;
        let order = rows::assemble(vec![row], items)
            .map_err(|e| InventoryError::Storage(e.to_string()))?
            .pop()
            .ok_or_else(|| InventoryError::OrderNotFound(order_id.clone()))?;

        let plan = delivery_credits(&order, policy);
        for credit in &plan.credits {
            upsert_stock(&mut tx, credit).await?;
        }

        sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
            .bind(order_id.as_str())
            .bind(OrderStatus::Delivered.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| InventoryError::Storage(format!("Failed to update order status: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| InventoryError::Storage(format!("Failed to commit delivery: {e}")))?;

        let receipt = plan.into_receipt(order_id, status);
        tracing::info!(
            order_id = %receipt.order_id,
            shop_id = %order.shop.id,
            previous_status = %status,
            credits = receipt.credits.len(),
            total_kg = receipt.total.kg(),
            "Credited delivery"
        );
        if receipt.is_partial() {
            tracing::warn!(
                order_id = %receipt.order_id,
                skipped = receipt.skipped.len(),
                flagged = receipt.flagged.len(),
                "Delivery credited with items that carried no bag counts"
            );
            metrics::counter!("inventory.deliveries.partial").increment(1);
        }
        metrics::counter!("inventory.deliveries.credited").increment(1);
        metrics::counter!("inventory.credited.grams").increment(receipt.total.grams());

        Ok(receipt)
    }

    async fn read_stock(
        &self,
        shop_id: ShopId,
        coffee_id: CoffeeId,
    ) -> Result<Option<ShopStock>, InventoryError> {
        sqlx::query_as::<_, StockRow>(
            r"
            SELECT small_bags_espresso, small_bags_filter, medium_bags_espresso,
                   medium_bags_filter, large_bags, total_grams, updated_at
            FROM shop_inventory
            WHERE shop_id = $1 AND coffee_id = $2
            ",
        )
        .bind(shop_id.as_str())
        .bind(coffee_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| InventoryError::Storage(format!("Failed to read stock: {e}")))?
        .map(ShopStock::try_from)
        .transpose()
    }
}

/// Add one credit to its inventory row, creating the row if needed.
///
/// `ON CONFLICT DO UPDATE` takes the row lock itself.
async fn upsert_stock(
    tx: &mut Transaction<'static, Postgres>,
    credit: &InventoryCredit,
) -> Result<(), InventoryError> {
    sqlx::query(
        r"
        INSERT INTO shop_inventory (
            shop_id, coffee_id, small_bags_espresso, small_bags_filter,
            medium_bags_espresso, medium_bags_filter, large_bags, total_grams, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
        ON CONFLICT (shop_id, coffee_id) DO UPDATE SET
            small_bags_espresso = shop_inventory.small_bags_espresso + EXCLUDED.small_bags_espresso,
            small_bags_filter = shop_inventory.small_bags_filter + EXCLUDED.small_bags_filter,
            medium_bags_espresso = shop_inventory.medium_bags_espresso + EXCLUDED.medium_bags_espresso,
            medium_bags_filter = shop_inventory.medium_bags_filter + EXCLUDED.medium_bags_filter,
            large_bags = shop_inventory.large_bags + EXCLUDED.large_bags,
            total_grams = shop_inventory.total_grams + EXCLUDED.total_grams,
            updated_at = now()
        ",
    )
    .bind(credit.shop_id.as_str())
    .bind(credit.coffee_id.as_str())
    .bind(column(credit.small_bags_espresso)?)
    .bind(column(credit.small_bags_filter)?)
    .bind(column(credit.medium_bags_espresso)?)
    .bind(column(credit.medium_bags_filter)?)
    .bind(column(credit.large_bags)?)
    .bind(column(credit.total.grams())?)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        InventoryError::Storage(format!(
            "Failed to credit {} at {}: {e}",
            credit.coffee_id, credit.shop_id
        ))
    })?;
    Ok(())
}

/// Roll back a delivery that will not go ahead. A failed rollback is logged;
/// the connection drops the transaction either way.
async fn rollback(tx: Transaction<'static, Postgres>, order_id: &OrderId) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(order_id = %order_id, error = %e, "Failed to roll back delivery");
    }
}

impl InventoryLedger for PostgresInventoryLedger {
    fn credit_delivery(
        &self,
        order_id: OrderId,
        policy: StoredTotalPolicy,
    ) -> BoxFuture<'_, Result<DeliveryReceipt, InventoryError>> {
        Box::pin(self.credit(order_id, policy))
    }

    fn stock(
        &self,
        shop_id: ShopId,
        coffee_id: CoffeeId,
    ) -> BoxFuture<'_, Result<Option<ShopStock>, InventoryError>> {
        Box::pin(self.read_stock(shop_id, coffee_id))
    }
}
