//! Per-order endpoints.
//!
//! - GET /api/v1/orders/:id/quantities - Normalized quantities of each line item
//! - POST /api/v1/orders/:id/deliver - Credit an order into its shop's inventory

use crate::WebResult;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use bean_route_core::{
    CoffeeRef, DeliveryReceipt, NormalizedItem, OrderId, OrderStatus, ShopRef, StoredTotalPolicy,
    Weight, normalize_line_item,
};
use serde::Serialize;

/// One line item after normalization.
#[derive(Debug, Serialize)]
pub struct ItemQuantities {
    /// Position within the order
    pub index: usize,
    /// Coffee, `None` when the reference is missing
    pub coffee: Option<CoffeeRef>,
    /// Canonical counts
    #[serde(flatten)]
    pub normalized: NormalizedItem,
    /// Weight the item counts for under the configured policy
    #[serde(rename = "total_kg")]
    pub total: Weight,
    /// Bag counts are zero but a stored total is not
    pub ambiguous: bool,
}

/// Normalized quantities of a whole order.
#[derive(Debug, Serialize)]
pub struct OrderQuantities {
    /// Order
    pub order_id: OrderId,
    /// Current status
    pub status: OrderStatus,
    /// Ordering shop
    pub shop: ShopRef,
    /// Policy applied to ambiguous items
    pub stored_total_policy: StoredTotalPolicy,
    /// Items in order
    pub items: Vec<ItemQuantities>,
    /// Sum over items that have a coffee
    #[serde(rename = "total_kg")]
    pub total: Weight,
}

/// Delivery receipt plus a partial marker.
#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    /// Some items were skipped or flagged; stock may be short
    pub partial: bool,
    /// The receipt
    #[serde(flatten)]
    pub receipt: DeliveryReceipt,
}

/// Normalized quantities for each line item of one order.
///
/// # Errors
///
/// 404 for an unknown order, 503 if it cannot be fetched.
pub async fn order_quantities(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<OrderQuantities>> {
    let policy = state.defaults.stored_total_policy;
    let order = state
        .orders
        .fetch_order(OrderId::new(id.as_str()))
        .await?
        .ok_or_else(|| AppError::not_found("Order", &id))?;

    let items: Vec<ItemQuantities> = order
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let normalized = normalize_line_item(item);
            ItemQuantities {
                index,
                coffee: item.coffee.clone(),
                total: normalized.resolve_weight(policy),
                ambiguous: normalized.is_ambiguous(),
                normalized,
            }
        })
        .collect();
    let total = items
        .iter()
        .filter(|item| item.coffee.is_some())
        .map(|item| item.total)
        .sum();

    Ok(Json(OrderQuantities {
        order_id: order.id,
        status: order.status,
        shop: order.shop,
        stored_total_policy: policy,
        items,
        total,
    }))
}

/// Credit a delivered order into its shop's inventory.
///
/// The order is delivered even when some items credit nothing; `partial`,
/// `skipped` and `flagged` tell the client which ones.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/orders/order-1/deliver
/// ```
///
/// # Errors
///
/// 404 for an unknown order, 409 if it was already delivered or is cancelled.
pub async fn deliver_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<DeliveryResponse>> {
    let receipt = state
        .ledger
        .credit_delivery(OrderId::new(id), state.defaults.stored_total_policy)
        .await?;
    Ok(Json(DeliveryResponse {
        partial: receipt.is_partial(),
        receipt,
    }))
}
