//! Application state for Axum handlers.

use crate::config::ReportDefaults;
use bean_route_core::{InventoryLedger, OrderSource};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Collaborators are trait objects so the server runs against `PostgreSQL`
/// and the tests against the in-memory store.
#[derive(Clone)]
pub struct AppState {
    /// Order reads
    pub orders: Arc<dyn OrderSource>,
    /// Delivery crediting
    pub ledger: Arc<dyn InventoryLedger>,
    /// Report defaults from configuration
    pub defaults: ReportDefaults,
}

impl AppState {
    /// Create the state.
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderSource>,
        ledger: Arc<dyn InventoryLedger>,
        defaults: ReportDefaults,
    ) -> Self {
        Self {
            orders,
            ledger,
            defaults,
        }
    }
}
