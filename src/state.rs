use std::sync::Arc;

use sqlx::SqlitePool;

use crate::services::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub pipeline: Arc<Pipeline>,
}
