//! Error types for the reconciliation engine and its collaborators.

use crate::types::{OrderId, OrderStatus};
use thiserror::Error;

/// Errors raised by the order-fetch collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Database connection or query failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A persisted row could not be mapped to a domain value.
    #[error("Malformed row: {0}")]
    MalformedRow(String),
}

/// Errors surfaced by engine entry points.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Fetching orders failed; propagated unchanged.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A status name did not match any [`OrderStatus`].
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    /// A key strategy name was not recognised.
    #[error("Unknown key strategy: {0} (expected coffee, coffee_shop or coffee_grade)")]
    UnknownKeyStrategy(String),
}

/// Errors from crediting delivered orders into shop inventory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// No order with this id exists.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order was already credited.
    #[error("Order {0} has already been delivered")]
    AlreadyDelivered(OrderId),

    /// The order's status does not allow delivery.
    #[error("Order {order_id} cannot be delivered from status {from}")]
    InvalidTransition {
        /// The order in question.
        order_id: OrderId,
        /// Its current status.
        from: OrderStatus,
    },

    /// Storage backend failed; the transaction was rolled back.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
