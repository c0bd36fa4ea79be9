use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};
use validator::Validate;

use crate::config::AppState;
use crate::middleware::error_handling::Result;
use crate::models::reports::{ProfitabilityQuery, VarianceQuery};
use crate::services::ReportingService;

/// GET /api/reports/profitability?year=&month=&customer=
///
/// Served through the injected response cache; sync and import runs
/// invalidate the `reports:` prefix.
pub async fn profitability(
    State(state): State<AppState>,
    Query(query): Query<ProfitabilityQuery>,
) -> Result<Json<Value>> {
    query.validate()?;

    let cache_key = format!(
        "reports:profitability:{}:{}:{}",
        query.year.map(|y| y.to_string()).unwrap_or_default(),
        query.month.map(|m| m.to_string()).unwrap_or_default(),
        query.customer.as_deref().unwrap_or_default().to_lowercase(),
    );

    if let Some(cached) = state.report_cache.get(&cache_key) {
        return Ok(Json(cached));
    }

    let service = ReportingService::new(state.db_pool.clone());
    let report = service
        .profitability(query.year, query.month, query.customer.as_deref())
        .await?;

    let body = json!({
        "success": true,
        "summary": report.summary,
        "orders": report.orders,
    });
    state.report_cache.insert(cache_key, body.clone());

    Ok(Json(body))
}

/// GET /api/reports/variance?year=
pub async fn variance(
    State(state): State<AppState>,
    Query(query): Query<VarianceQuery>,
) -> Result<Json<Value>> {
    query.validate()?;

    let service = ReportingService::new(state.db_pool.clone());
    let (rows, unnamed_lines) = service.variance(query.year).await?;

    Ok(Json(json!({
        "success": true,
        "total": rows.len(),
        "divergent_orders": rows,
        "unnamed_line_count": unnamed_lines,
    })))
}
