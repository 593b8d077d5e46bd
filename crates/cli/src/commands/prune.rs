//! `logbard prune` — delete semantic memories older than a cutoff.

use crate::commands::build_engine;
use chrono::{Duration, Utc};
use logbard_config::AppConfig;

pub async fn run(days: i64) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let engine = build_engine(config).await?;

    let removed = engine
        .memory
        .prune_older_than(Utc::now() - Duration::days(days))
        .await?;

    println!("Removed {removed} memories older than {days} days.");
    Ok(())
}
