mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use timetable_sync::error::FetchError;
use timetable_sync::services::{NoopMessenger, Pipeline, SyncScheduler};
use timetable_sync::source::{RawSnapshot, ScheduleSource};

/// Counts fetch attempts and always fails, so no cycle ever writes.
struct CountingSource {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ScheduleSource for CountingSource {
    async fn fetch(&self) -> Result<RawSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::AssetNotFound("offline".to_string()))
    }
}

#[tokio::test]
async fn test_scheduler_runs_eagerly_and_keeps_going_after_failures() {
    let pool = common::setup_db().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(CountingSource {
        calls: calls.clone(),
    });
    let pipeline = Arc::new(Pipeline::new(pool, source, Arc::new(NoopMessenger)));

    let scheduler = SyncScheduler::new(pipeline, Duration::from_millis(100));
    let scheduler_task = tokio::spawn(scheduler.start());

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1, "first cycle runs at startup");

    tokio::time::sleep(Duration::from_millis(250)).await;
    scheduler_task.abort();

    assert!(calls.load(Ordering::SeqCst) >= 3);
}
