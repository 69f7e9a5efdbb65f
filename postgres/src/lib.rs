//! `PostgreSQL` persistence for Bean Route.
//!
//! This crate implements the collaborator traits from `bean-route-core`
//! over sqlx:
//!
//! - [`PostgresOrderSource`]: orders with their shop and coffees joined
//! - [`PostgresInventoryLedger`]: transactional delivery crediting
//! - [`migrate`]: the schema, embedded from `migrations/`
//!
//! # Example
//!
//! ```no_run
//! use bean_route_postgres::{PostgresInventoryLedger, PostgresOrderSource, migrate};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = sqlx::PgPool::connect("postgres://localhost/bean_route").await?;
//! migrate(&pool).await?;
//!
//! let orders = PostgresOrderSource::new(pool.clone());
//! let ledger = PostgresInventoryLedger::new(pool);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod ledger;
mod order_source;
mod rows;

pub use ledger::PostgresInventoryLedger;
pub use order_source::PostgresOrderSource;

use bean_route_core::SourceError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Run the embedded migrations.
///
/// # Errors
///
/// Returns [`SourceError::Database`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), SourceError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| SourceError::Database(format!("Migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`SourceError::Database`] if no connection can be established
/// within `connect_timeout`.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    connect_timeout: Duration,
) -> Result<PgPool, SourceError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(connect_timeout)
        .connect(database_url)
        .await
        .map_err(|e| SourceError::Database(format!("Failed to connect: {e}")))
}
