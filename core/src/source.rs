//! Order-fetch collaborator.
//!
//! The engine never talks to storage itself. Callers hand it an
//! [`OrderSource`] that returns orders with shop and coffee already joined.

use crate::aggregate::{AggregationOptions, AggregationReport, StatusFilter, aggregate_orders};
use crate::error::{EngineError, SourceError};
use crate::types::{Order, OrderId};
use futures::future::BoxFuture;

/// Source of orders with their items, shop and coffees joined.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so sources can be shared as
/// `Arc<dyn OrderSource>`.
pub trait OrderSource: Send + Sync {
    /// Orders passing `filter`, each with all of its line items.
    ///
    /// # Errors
    ///
    /// Any [`SourceError`] from the backend.
    fn fetch_orders(&self, filter: StatusFilter) -> BoxFuture<'_, Result<Vec<Order>, SourceError>>;

    /// One order by id, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Any [`SourceError`] from the backend.
    fn fetch_order(&self, id: OrderId) -> BoxFuture<'_, Result<Option<Order>, SourceError>>;
}

/// Fetch the orders selected by `options` once, then aggregate them.
///
/// # Errors
///
/// [`EngineError::Source`] if the fetch fails. Nothing is retried here.
pub async fn build_report(
    source: &dyn OrderSource,
    options: &AggregationOptions,
) -> Result<AggregationReport, EngineError> {
    let orders = source.fetch_orders(options.status_filter).await?;
    Ok(aggregate_orders(&orders, options))
}
