//! `logbard assemble` — print the assembled prompt without generating.

use crate::commands::{build_engine, default_history_budget};
use crate::logsource::FileLogSource;
use logbard_config::AppConfig;
use logbard_core::collaborator::LogSource;
use std::path::PathBuf;

pub async fn run(
    owner: String,
    input: Option<PathBuf>,
    history_budget: Option<usize>,
) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let budget = history_budget.unwrap_or_else(|| default_history_budget(&config));
    let engine = build_engine(config).await?;

    let lines = FileLogSource::new(input).fetch(&owner).await?;
    let assembled = engine.assembler.assemble(&owner, &lines, budget).await?;

    println!("{}", assembled.prompt);
    println!();
    println!(
        "-- {} prompt tokens, {} available, num_predict {}{}",
        assembled.budget.prompt_tokens,
        assembled.budget.available,
        assembled.budget.num_predict,
        if assembled.budget.degraded { " (degraded)" } else { "" }
    );
    println!(
        "-- tiers: {} history, {} memories, {} entity chars{}",
        assembled.tiers.history_items,
        assembled.tiers.memory_items,
        assembled.tiers.entity_block_chars,
        if assembled.tiers.degraded.is_empty() {
            String::new()
        } else {
            format!(", degraded: {}", assembled.tiers.degraded.join(", "))
        }
    );

    Ok(())
}
