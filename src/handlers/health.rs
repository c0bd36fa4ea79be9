use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::config::AppState;
use crate::middleware::error_handling::Result;

/// GET /api/health — liveness plus a store round-trip.
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>> {
    let db_ok: i32 = sqlx::query_scalar("SELECT 1")
        .fetch_one(&state.db_pool)
        .await?;

    Ok(Json(json!({
        "success": true,
        "status": "healthy",
        "database": db_ok == 1,
    })))
}
