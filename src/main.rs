use std::sync::Arc;

use tracing::info;

use timetable_sync::api::router;
use timetable_sync::config::Config;
use timetable_sync::services::SyncScheduler;
use timetable_sync::state::AppState;
use timetable_sync::{build_pipeline, db, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::from_env()?;

    info!("Initializing database...");
    let pool = db::connect(&config.database_url).await?;

    let pipeline = Arc::new(build_pipeline(&config, pool.clone())?);

    let scheduler = SyncScheduler::new(pipeline.clone(), config.check_interval);
    tokio::spawn(scheduler.start());

    let state = AppState {
        db: pool,
        pipeline,
    };
    let app = router(state);

    info!("listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
