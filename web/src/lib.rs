//! HTTP surface for the Bean Route quantity engine.
//!
//! A thin Axum shell around `bean-route-core`: handlers parse the request,
//! call the engine or a collaborator, and map the result to JSON. No
//! quantity arithmetic happens here.
//!
//! # Routes
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | GET | `/health` | [`handlers::health_check`] |
//! | GET | `/api/v1/reports/orders` | [`handlers::order_report`] |
//! | GET | `/api/v1/orders/:id/quantities` | [`handlers::order_quantities`] |
//! | POST | `/api/v1/orders/:id/deliver` | [`handlers::deliver_order`] |
//!
//! # Example
//!
//! ```no_run
//! use bean_route_web::{AppState, Config, build_router};
//! use bean_route_postgres::{PostgresInventoryLedger, PostgresOrderSource, connect};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env();
//! let pool = connect(
//!     &config.database.url,
//!     config.database.max_connections,
//!     config.database.connect_timeout(),
//! )
//! .await?;
//! let state = AppState::new(
//!     Arc::new(PostgresOrderSource::new(pool.clone())),
//!     Arc::new(PostgresInventoryLedger::new(pool)),
//!     config.reports.defaults()?,
//! );
//! let app = build_router(state);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
