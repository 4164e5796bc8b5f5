use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Failures while retrieving the upstream page or its data asset.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Data asset not found: {0}")]
    AssetNotFound(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A single recipient could not be reached.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::Fetch(e) => {
                error!("upstream fetch error: {}", e);
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            AppError::Sync(e) => {
                error!("sync error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Schedule synchronization failed".to_string(),
                )
            }
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Migration(e) => {
                error!("migration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
