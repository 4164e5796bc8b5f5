use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db::repository;
use crate::error::{AppError, DeliveryError};

pub const CHANGE_NOTICE: &str = "🔔 Расписание обновилось! Проверьте изменения.";

const TELEGRAM_API: &str = "https://api.telegram.org";

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, subscriber_id: i64, text: &str) -> Result<(), DeliveryError>;
}

/// Delivers through the Telegram Bot API `sendMessage` method.
pub struct TelegramMessenger {
    client: Client,
    api_base: String,
    token: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

impl TelegramMessenger {
    pub fn new(token: String, timeout: Duration) -> Result<Self, AppError> {
        Self::with_api_base(token, TELEGRAM_API.to_string(), timeout)
    }

    pub fn with_api_base(token: String, api_base: String, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, subscriber_id: i64, text: &str) -> Result<(), DeliveryError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest {
                chat_id: subscriber_id,
                text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Used when no bot token is configured: notifications only reach the log.
pub struct NoopMessenger;

#[async_trait]
impl Messenger for NoopMessenger {
    async fn send(&self, subscriber_id: i64, text: &str) -> Result<(), DeliveryError> {
        debug!("Notification for {} not delivered (no messenger): {}", subscriber_id, text);
        Ok(())
    }
}

/// Best-effort fan-out of a message to every subscriber.
pub struct Notifier {
    db: SqlitePool,
    messenger: Arc<dyn Messenger>,
}

impl Notifier {
    pub fn new(db: SqlitePool, messenger: Arc<dyn Messenger>) -> Self {
        Self { db, messenger }
    }

    /// Returns the number of successful deliveries. A failed recipient is
    /// logged and skipped; there is no retry.
    pub async fn broadcast(&self, message: &str) -> Result<usize, sqlx::Error> {
        let subscribers = repository::list_subscribers(&self.db).await?;

        let mut delivered = 0;
        for subscriber_id in &subscribers {
            match self.messenger.send(*subscriber_id, message).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to notify {}: {}", subscriber_id, e),
            }
        }

        info!("Sent notifications to {} of {} users", delivered, subscribers.len());
        Ok(delivered)
    }
}
