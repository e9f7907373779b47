use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::migrate::MigrateError;
use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Reconciliation-run errors
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("A reconciliation run is already in progress")]
    AlreadyRunning,

    #[error("Worker pool is closed")]
    PoolClosed,

    #[error("Batch worker dropped its result channel")]
    ResultChannelClosed,
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            AppError::Reconcile(ReconcileError::AlreadyRunning) => (
                StatusCode::CONFLICT,
                "RECONCILIATION_IN_PROGRESS",
                "A reconciliation run is already in progress".to_string(),
                None,
            ),
            AppError::Reconcile(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "RECONCILIATION_FAILED",
                err.to_string(),
                None,
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
