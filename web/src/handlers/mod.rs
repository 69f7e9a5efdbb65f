//! HTTP request handlers.

pub mod health;
pub mod orders;
pub mod reports;

pub use health::health_check;
pub use orders::{deliver_order, order_quantities};
pub use reports::order_report;
