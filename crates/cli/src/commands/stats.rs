//! `logbard stats` — history and memory statistics for an owner.

use crate::commands::build_engine;
use logbard_config::AppConfig;

pub async fn run(owner: String) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let engine = build_engine(config).await?;

    let history = engine.history.statistics(&owner).await?;
    println!("History for {owner}:");
    println!("  total summaries:   {}", history.total_summaries);
    println!("  last 7 days:       {}", history.recent_summaries_7d);
    if let (Some(earliest), Some(latest)) = (history.earliest, history.latest) {
        println!("  coverage:          {earliest} .. {latest}");
    }

    let memory = engine.memory.stats().await?;
    println!("Semantic memory:");
    println!("  enabled:           {}", memory.enabled);
    println!("  total memories:    {}", memory.total_memories);
    if let Some(dimension) = memory.dimension {
        println!("  dimension:         {dimension}");
    }
    for (owner_key, count) in &memory.per_owner {
        println!("    {owner_key}: {count}");
    }

    let active = engine.profiles.most_active(&owner, 10).await?;
    if !active.is_empty() {
        println!("Most active players:");
        for (name, events) in active {
            println!("  {name}: {events} events");
        }
    }

    Ok(())
}
