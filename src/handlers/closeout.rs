use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde_json::{json, Value};
use validator::Validate;

use crate::config::AppState;
use crate::middleware::error_handling::{AppError, Result};
use crate::models::closeout::{CloseoutQuery, EnrichRequest};
use crate::repositories::CloseoutRepository;
use crate::services::CloseoutImportService;

/// POST /api/closeout/import — multipart upload with a `file` field holding
/// the closeout workbook.
pub async fn import(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<Value>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename = String::from("closeout.xlsx");

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart data: {}", e)))?
    {
        if field.name() == Some("file") {
            if let Some(name) = field.file_name() {
                filename = name.to_string();
            }
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Failed to read file: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let file_data = file_data
        .ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    tracing::info!("Closeout import upload: {} ({} bytes)", filename, file_data.len());

    let service = CloseoutImportService::new(state.db_pool.clone());
    let report = service.import(&file_data, &filename).await?;

    state.report_cache.invalidate_prefix("closeout:");

    Ok(Json(json!({ "success": true, "report": report })))
}

/// POST /api/closeout/enrich
pub async fn enrich(
    State(state): State<AppState>,
    Json(request): Json<EnrichRequest>,
) -> Result<Json<Value>> {
    request.validate()?;

    let service = CloseoutImportService::new(state.db_pool.clone());
    let report = service.enrich_from_netsuite(request.year).await?;

    state.report_cache.invalidate_prefix("closeout:");

    Ok(Json(json!({ "success": true, "report": report })))
}

/// GET /api/closeout/projects?year=
pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<CloseoutQuery>,
) -> Result<Json<Value>> {
    query.validate()?;

    let repo = CloseoutRepository::new(state.db_pool.clone());
    let projects = repo.list_projects(query.year).await?;

    Ok(Json(json!({
        "success": true,
        "total": projects.len(),
        "projects": projects,
    })))
}
