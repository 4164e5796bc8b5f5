//! Runs exactly one update cycle and prints the resulting entity counts.

use tracing::{error, info};

use timetable_sync::config::Config;
use timetable_sync::db::repository;
use timetable_sync::{build_pipeline, db, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::from_env()?;
    let pool = db::connect(&config.database_url).await?;
    let pipeline = build_pipeline(&config, pool.clone())?;

    info!("Running update cycle...");
    match pipeline.run_cycle().await {
        Ok(outcome) => info!("Cycle finished: {}", serde_json::to_string(&outcome)?),
        Err(e) => error!("Cycle failed: {}", e),
    }

    let counts = repository::count_entities(&pool).await?;
    println!("classes:       {}", counts.classes);
    println!("teachers:      {}", counts.teachers);
    println!("lessons:       {}", counts.lessons);
    println!("substitutions: {}", counts.substitutions);

    if counts.classes == 0 || counts.lessons == 0 {
        error!("Database is empty after the cycle");
        std::process::exit(1);
    }
    Ok(())
}
