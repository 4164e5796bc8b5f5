#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use timetable_sync::error::{DeliveryError, FetchError};
use timetable_sync::services::Messenger;
use timetable_sync::source::{RawSnapshot, ScheduleSource};

pub async fn setup_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    timetable_sync::db::migrate(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub fn sample_payload() -> Value {
    serde_json::json!({
        "CLASSES": {"5": "10A"},
        "TEACHERS": {},
        "CLASS_SCHEDULE": {"60": {"5": {"101": {"s": ["036"], "t": [], "r": ["005"]}}}},
        "SUBJECTS": {"036": "Math"}
    })
}

/// Serves whatever payload it currently holds.
pub struct StaticSource {
    payload: Mutex<Value>,
}

impl StaticSource {
    pub fn new(payload: Value) -> Self {
        Self {
            payload: Mutex::new(payload),
        }
    }

    pub fn set(&self, payload: Value) {
        *self.payload.lock().unwrap() = payload;
    }
}

#[async_trait]
impl ScheduleSource for StaticSource {
    async fn fetch(&self) -> Result<RawSnapshot, FetchError> {
        let payload = self.payload.lock().unwrap().clone();
        RawSnapshot::from_value(payload)
            .ok_or_else(|| FetchError::MalformedPayload("not an object".to_string()))
    }
}

/// Records successful deliveries; ids in `failing` are rejected.
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<i64>>,
    failing: Vec<i64>,
}

impl RecordingMessenger {
    pub fn failing_for(failing: Vec<i64>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing,
        }
    }

    pub fn sent(&self) -> Vec<i64> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, subscriber_id: i64, _text: &str) -> Result<(), DeliveryError> {
        if self.failing.contains(&subscriber_id) {
            return Err(DeliveryError::Rejected {
                status: 403,
                body: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().unwrap().push(subscriber_id);
        Ok(())
    }
}
