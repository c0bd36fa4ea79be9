// Sync trigger endpoints. Each runs a full pull-map-upsert pass inline and
// returns the run report; there is no background fan-out, so the response
// reflects exactly what landed in the store.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::config::AppState;
use crate::middleware::error_handling::Result;
use crate::models::netsuite::SyncRequest;
use crate::services::netsuite::{NetSuiteClient, NetSuiteSyncService};

#[derive(Debug, Deserialize)]
pub struct PurgeRequest {
    pub netsuite_ids: Vec<i64>,
}

/// POST /api/sync/sales-orders
pub async fn sync_sales_orders(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<Value>> {
    request.validate()?;
    tracing::info!("Sales order sync requested (year: {:?})", request.year);

    let client = NetSuiteClient::new(state.netsuite.clone())?;
    let service = NetSuiteSyncService::new(state.db_pool.clone(), client);

    let report = service.sync_sales_orders(request.year).await?;
    state.report_cache.invalidate_prefix("reports:");

    Ok(Json(json!({ "success": true, "report": report })))
}

/// POST /api/sync/work-orders
pub async fn sync_work_orders(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<Value>> {
    request.validate()?;
    tracing::info!("Work order sync requested (year: {:?})", request.year);

    let client = NetSuiteClient::new(state.netsuite.clone())?;
    let service = NetSuiteSyncService::new(state.db_pool.clone(), client);

    let report = service.sync_work_orders(request.year).await?;
    state.report_cache.invalidate_prefix("reports:");

    Ok(Json(json!({ "success": true, "report": report })))
}

/// POST /api/sync/sales-orders/purge — bulk-delete mirrored orders ahead of
/// a full reconciliation. Stops at the first failing batch; the response
/// always says how far it got.
pub async fn purge_sales_orders(
    State(state): State<AppState>,
    Json(request): Json<PurgeRequest>,
) -> Result<impl IntoResponse> {
    let response = match NetSuiteSyncService::purge_sales_orders(
        &state.db_pool,
        &request.netsuite_ids,
    )
    .await
    {
        Ok(report) => {
            state.report_cache.invalidate_prefix("reports:");
            (
                StatusCode::OK,
                Json(json!({ "success": true, "report": report })),
            )
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "purge_failed",
                "message": err.to_string(),
                "failed_batch": err.batch,
                "ids_processed": err.ids_processed,
            })),
        ),
    };

    Ok(response)
}

/// POST /api/sync/work-orders/purge
pub async fn purge_work_orders(
    State(state): State<AppState>,
    Json(request): Json<PurgeRequest>,
) -> Result<impl IntoResponse> {
    let response = match NetSuiteSyncService::purge_work_orders(
        &state.db_pool,
        &request.netsuite_ids,
    )
    .await
    {
        Ok(report) => {
            state.report_cache.invalidate_prefix("reports:");
            (
                StatusCode::OK,
                Json(json!({ "success": true, "report": report })),
            )
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "purge_failed",
                "message": err.to_string(),
                "failed_batch": err.batch,
                "ids_processed": err.ids_processed,
            })),
        ),
    };

    Ok(response)
}
