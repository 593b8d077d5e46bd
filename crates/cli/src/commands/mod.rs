//! CLI command implementations.

pub mod assemble;
pub mod explain;
pub mod init;
pub mod profile;
pub mod prune;
pub mod run;
pub mod stats;

use logbard_config::AppConfig;
use logbard_context::{build_counter, BudgetPlanner, ContextAssembler};
use logbard_core::collaborator::Embedder;
use logbard_history::{SqliteSummaryStore, ThreadManager};
use logbard_memory::{SemanticMemory, SqliteMemoryArchive};
use logbard_profiles::{ProfileManager, SqliteProfileStore, TtlCache};
use logbard_providers::OllamaEmbedder;
use std::sync::Arc;
use std::time::Duration;

/// Everything a command needs, wired once from configuration.
pub struct Engine {
    pub config: AppConfig,
    pub history: Arc<ThreadManager>,
    pub memory: Arc<SemanticMemory>,
    pub profiles: Arc<ProfileManager>,
    pub assembler: ContextAssembler,
}

/// Build the full engine from configuration.
///
/// All three stores share the configured SQLite file; each opens its own
/// small pool. The embedding backend is attached only when semantic memory
/// is enabled.
pub async fn build_engine(config: AppConfig) -> anyhow::Result<Engine> {
    let summaries = Arc::new(SqliteSummaryStore::new(&config.db_path).await?);
    let archive = Arc::new(SqliteMemoryArchive::new(&config.db_path).await?);
    let profile_store = Arc::new(SqliteProfileStore::new(&config.db_path).await?);

    let embedder: Option<Arc<dyn Embedder>> = if config.memory.enabled {
        Some(Arc::new(OllamaEmbedder::new(&config.provider)))
    } else {
        None
    };

    let history = Arc::new(ThreadManager::new(
        summaries.clone(),
        config.history.clone(),
        config.threading.clone(),
    ));
    let memory = Arc::new(SemanticMemory::new(
        archive,
        embedder,
        config.memory.relevance_threshold,
        config.memory.top_k,
    ));
    let profiles = Arc::new(ProfileManager::new(
        profile_store,
        Arc::new(TtlCache::new(Duration::from_secs(config.profiles.cache_ttl_secs))),
        config.profiles.clone(),
    ));

    let planner = BudgetPlanner::new(config.budget.clone(), build_counter(&config.budget));
    let assembler = ContextAssembler::new(
        history.clone(),
        memory.clone(),
        profiles.clone(),
        summaries,
        planner,
        &config.assembler,
        config.profiles.blurb_max_chars,
    );

    Ok(Engine {
        config,
        history,
        memory,
        profiles,
        assembler,
    })
}

/// Default history-tier budget: half the context window, leaving the rest
/// for memories, blurbs, the new events, and the generated output.
pub fn default_history_budget(config: &AppConfig) -> usize {
    config.budget.context_window / 2
}
