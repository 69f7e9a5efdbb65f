//! `PostgreSQL` order source.

use crate::rows::{self, ORDER_COLUMNS, OrderRow};
use bean_route_core::{
    BoxFuture, Order, OrderId, OrderSource, OrderStatus, SourceError, StatusFilter,
};
use sqlx::PgPool;

/// Reads orders, their shop and their items' coffees from `PostgreSQL`.
///
/// Each fetch is two queries: the matching orders, then all of their items.
///
/// # Example
///
/// ```no_run
/// use bean_route_core::{AggregationOptions, build_report};
/// use bean_route_postgres::PostgresOrderSource;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = sqlx::PgPool::connect("postgres://localhost/bean_route").await?;
/// let source = PostgresOrderSource::new(pool);
/// let report = build_report(&source, &AggregationOptions::new()).await?;
/// println!("{} kg pending", report.grand_total.total_kg());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresOrderSource {
    pool: PgPool,
}

impl PostgresOrderSource {
    /// Create an order source over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load(&self, filter: StatusFilter) -> Result<Vec<Order>, SourceError> {
        let statuses: Vec<String> = OrderStatus::ALL
            .into_iter()
            .filter(|status| filter.matches(*status))
            .map(|status| status.as_str().to_string())
            .collect();

        let order_rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_COLUMNS} WHERE o.status = ANY($1) ORDER BY o.created_at, o.id"
        ))
        .bind(&statuses)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SourceError::Database(format!("Failed to load orders: {e}")))?;

        if order_rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = order_rows.iter().map(|row| row.id.clone()).collect();
        let item_rows = rows::fetch_items(&self.pool, &ids)
            .await
            .map_err(|e| SourceError::Database(format!("Failed to load order items: {e}")))?;

        let orders = rows::assemble(order_rows, item_rows)?;
        tracing::debug!(
            orders = orders.len(),
            filter = ?filter,
            "Loaded orders"
        );
        Ok(orders)
    }

    async fn load_one(&self, id: OrderId) -> Result<Option<Order>, SourceError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_COLUMNS} WHERE o.id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SourceError::Database(format!("Failed to load order {id}: {e}")))?
        else {
            return Ok(None);
        };

        let item_rows = rows::fetch_items(&self.pool, &[row.id.clone()])
            .await
            .map_err(|e| SourceError::Database(format!("Failed to load items of {id}: {e}")))?;

        Ok(rows::assemble(vec![row], item_rows)?.pop())
    }
}

impl OrderSource for PostgresOrderSource {
    fn fetch_orders(&self, filter: StatusFilter) -> BoxFuture<'_, Result<Vec<Order>, SourceError>> {
        Box::pin(self.load(filter))
    }

    fn fetch_order(&self, id: OrderId) -> BoxFuture<'_, Result<Option<Order>, SourceError>> {
        Box::pin(self.load_one(id))
    }
}
