// Central error type for the API surface.
//
// Detailed errors (database, remote-call bodies) are logged server-side with
// tracing; clients receive the dashboard envelope `{ "error", "message" }`
// with an appropriate status. No error is dropped without a log line.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::services::netsuite::sync_service::SyncError;
use crate::services::netsuite::NetSuiteError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] JsonRejection),

    #[error("NetSuite query failed: {0}")]
    NetSuite(#[from] NetSuiteError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Database(e) => AppError::Database(e),
            SyncError::NetSuite(e) => AppError::NetSuite(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::Database(ref err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Internal server error".to_string(),
                )
            }
            AppError::Validation(ref err) => {
                (StatusCode::BAD_REQUEST, "validation_failed", err.to_string())
            }
            AppError::Json(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_json",
                "Invalid JSON body".to_string(),
            ),
            AppError::NetSuite(ref err) => {
                tracing::error!("NetSuite call failed: {}", err);
                (StatusCode::BAD_GATEWAY, "netsuite_error", err.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "invalid_input", msg),
            AppError::Internal(ref err) => {
                tracing::error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
