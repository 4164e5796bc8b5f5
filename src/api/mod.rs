use axum::Json;
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use crate::db::repository::{self, SyncDigest};
use crate::error::AppError;
use crate::models::EntityCounts;
use crate::services::CycleOutcome;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub counts: EntityCounts,
    pub last_digest: Option<SyncDigest>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/sync", post(sync_now))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let counts = repository::count_entities(&state.db).await?;
    let last_digest = repository::get_digest(&state.db).await?;
    Ok(Json(StatusResponse { counts, last_digest }))
}

async fn sync_now(State(state): State<AppState>) -> Result<Json<CycleOutcome>, AppError> {
    let outcome = state.pipeline.run_cycle().await?;
    Ok(Json(outcome))
}
