//! Order quantity report.
//!
//! - GET /api/v1/reports/orders - Aggregated quantities across orders

use crate::WebResult;
use crate::config::policy;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use bean_route_core::{
    AggregationOptions, AggregationReport, KeyStrategy, StatusFilter, StoredTotalPolicy,
    build_report,
};
use serde::{Deserialize, Serialize};

/// Query parameters. Every parameter is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// Status name, `open` or `all`
    pub status: Option<String>,
    /// `coffee`, `coffee_shop` or `coffee_grade`
    pub key: Option<String>,
    /// Include per-shop breakdown and subtotals
    pub shop_breakdown: Option<bool>,
    /// Count stored totals of items without bag counts
    pub fallback: Option<bool>,
}

impl ReportQuery {
    /// Resolve against the configured defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::bad_request`] for an unknown status or key.
    pub fn options(&self, state: &AppState) -> Result<AggregationOptions, AppError> {
        let status_filter = match self.status.as_deref() {
            Some(status) => status.parse::<StatusFilter>()?,
            None => state.defaults.status_filter,
        };
        let key_strategy = match self.key.as_deref() {
            Some(key) => key.parse::<KeyStrategy>()?,
            None => KeyStrategy::default(),
        };
        let stored_total_policy = self
            .fallback
            .map_or(state.defaults.stored_total_policy, policy);

        Ok(AggregationOptions::new()
            .with_status_filter(status_filter)
            .with_key_strategy(key_strategy)
            .with_shop_breakdown(self.shop_breakdown.unwrap_or(false))
            .with_stored_total_policy(stored_total_policy))
    }
}

/// Report plus the options that produced it.
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    /// Filter applied
    pub status_filter: StatusFilter,
    /// Grouping applied
    pub key_strategy: KeyStrategy,
    /// Stored-total policy applied
    pub stored_total_policy: StoredTotalPolicy,
    /// Some items were skipped or flagged; totals may be incomplete
    pub partial: bool,
    /// The report
    #[serde(flatten)]
    pub report: AggregationReport,
}

/// Aggregate quantities across the orders selected by the query.
///
/// A partial report still returns 200; `partial`, `skipped` and `flagged`
/// tell the client which items did not count normally.
///
/// # Example
///
/// ```bash
/// curl 'http://localhost:8080/api/v1/reports/orders?status=open&key=coffee_shop&shop_breakdown=true'
/// ```
///
/// # Errors
///
/// 400 for an unknown status or key, 503 if orders cannot be fetched.
pub async fn order_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> WebResult<Json<ReportResponse>> {
    let options = query.options(&state)?;
    let report = build_report(state.orders.as_ref(), &options).await?;

    metrics::counter!("reports.generated").increment(1);
    metrics::counter!("reports.items.skipped").increment(report.skipped.len() as u64);
    metrics::counter!("reports.items.flagged").increment(report.flagged.len() as u64);

    Ok(Json(ReportResponse {
        status_filter: options.status_filter,
        key_strategy: options.key_strategy,
        stored_total_policy: options.stored_total_policy,
        partial: report.is_partial(),
        report,
    }))
}
