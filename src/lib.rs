pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod source;
pub mod state;

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::services::{Messenger, NoopMessenger, Pipeline, TelegramMessenger};
use crate::source::HttpScheduleSource;

/// Installs the `fmt` subscriber filtered by `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "timetable_sync=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wires the HTTP source and the messenger selected by `config` into a pipeline.
pub fn build_pipeline(config: &Config, db: SqlitePool) -> Result<Pipeline, AppError> {
    let source = Arc::new(HttpScheduleSource::new(config.source.clone())?);

    let messenger: Arc<dyn Messenger> = match &config.bot_token {
        Some(token) => Arc::new(TelegramMessenger::new(
            token.clone(),
            config.source.fetch_timeout,
        )?),
        None => {
            info!("BOT_TOKEN is not set; change notifications will only be logged");
            Arc::new(NoopMessenger)
        }
    };

    Ok(Pipeline::new(db, source, messenger))
}
