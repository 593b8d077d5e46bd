//! `logbard explain` — explain the similarity between two texts.

use crate::commands::build_engine;
use logbard_config::AppConfig;

pub async fn run(text_a: String, text_b: String) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let engine = build_engine(config).await?;

    let report = engine.memory.explain(&text_a, &text_b).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
