//! `logbard run` — one full cycle: ingest, assemble, generate, record.

use crate::commands::{build_engine, default_history_budget};
use crate::delivery::StdoutDelivery;
use crate::logsource::FileLogSource;
use logbard_config::AppConfig;
use logbard_core::collaborator::{Delivery, Generator, LogSource};
use logbard_providers::OllamaGenerator;
use std::path::PathBuf;
use tracing::{info, warn};

pub async fn run(
    owner: String,
    input: Option<PathBuf>,
    history_budget: Option<usize>,
) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let budget = history_budget.unwrap_or_else(|| default_history_budget(&config));
    let backend_url = config.provider.url.clone();
    let generator = OllamaGenerator::new(&config.provider, config.budget.context_window);
    let engine = build_engine(config).await?;

    if !generator.health_check().await.unwrap_or(false) {
        anyhow::bail!("generation backend at {backend_url} is not reachable");
    }

    let lines = FileLogSource::new(input).fetch(&owner).await?;
    if lines.is_empty() {
        info!("No event lines for {owner}; nothing to do");
        return Ok(());
    }

    let assembled = engine.assembler.assemble(&owner, &lines, budget).await?;
    info!(
        "Prompt: {} tokens, generation ceiling {} tokens{}",
        assembled.budget.prompt_tokens,
        assembled.budget.num_predict,
        if assembled.budget.degraded { " (degraded)" } else { "" }
    );

    // The generation call is long-running and holds no engine state.
    let response = generator
        .generate(&assembled.prompt, assembled.budget.num_predict, &owner)
        .await?;

    StdoutDelivery.deliver(&owner, &response).await?;

    if let Err(e) = engine.assembler.record_response(&owner, &response, &lines).await {
        warn!("Failed to record response for {owner}: {e}");
    }

    Ok(())
}
