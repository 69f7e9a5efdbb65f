//! # Bean Route Testing
//!
//! Testing utilities for the Bean Route quantity engine.
//!
//! This crate provides:
//! - In-memory implementations of the collaborator traits
//! - Fluent builders for orders and line items
//! - proptest strategies producing realistic, messy order data
//!
//! ## Example
//!
//! ```
//! use bean_route_core::{AggregationOptions, build_report};
//! use bean_route_testing::{InMemoryOrderStore, OrderBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryOrderStore::with_orders([
//!     OrderBuilder::new("o1").legacy_small("c1", "Bedecho", 9).build(),
//!     OrderBuilder::new("o2").legacy_small("c1", "Bedecho", 9).build(),
//! ]);
//!
//! let report = build_report(&store, &AggregationOptions::new()).await?;
//! assert_eq!(report.grand_total.total_kg(), 3.6);
//! # Ok(())
//! # }
//! ```

pub mod builders;
pub mod in_memory;
pub mod properties;

pub use builders::{LineItemBuilder, OrderBuilder};
pub use in_memory::{FailingOrderSource, InMemoryOrderStore};

/// Install a test-friendly tracing subscriber.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}
