//! Configuration loading, validation, and management for Logbard.
//!
//! One explicit configuration value object, constructed once at startup and
//! passed by reference into each component's constructor — no hidden global
//! state, no reloading behind the caller's back. Loads from
//! `~/.logbard/config.toml` with environment variable overrides and
//! validates all settings up front.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.logbard/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding summaries, memories, and profiles.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Token budget settings.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Conversation/history retrieval settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Thread-grouping relatedness settings.
    #[serde(default)]
    pub threading: ThreadingConfig,

    /// Semantic memory settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Entity profile settings.
    #[serde(default)]
    pub profiles: ProfilesConfig,

    /// Context assembler settings.
    #[serde(default)]
    pub assembler: AssemblerConfig,

    /// Generation/embedding backend settings.
    #[serde(default)]
    pub provider: ProviderConfig,
}

fn default_db_path() -> String {
    "logbard.db".into()
}

/// Token budget: context window, safety buffer, and output bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// The model's context window size in tokens (`num_ctx`).
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Tokens held back to absorb counting error.
    #[serde(default = "default_safety_buffer")]
    pub safety_buffer: usize,

    /// Minimum output tokens worth generating.
    #[serde(default = "default_min_output_tokens")]
    pub min_output_tokens: usize,

    /// Maximum output tokens ever granted.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: usize,

    /// Optional HF tokenizer file for exact counting. When absent or
    /// unloadable the character heuristic is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_file: Option<String>,
}

fn default_context_window() -> usize {
    4096
}
fn default_safety_buffer() -> usize {
    48
}
fn default_min_output_tokens() -> usize {
    64
}
fn default_max_output_tokens() -> usize {
    512
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            safety_buffer: default_safety_buffer(),
            min_output_tokens: default_min_output_tokens(),
            max_output_tokens: default_max_output_tokens(),
            tokenizer_file: None,
        }
    }
}

/// How the history budget is split between conversation flow and older
/// context, and how deep the store is scanned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Fraction of the history budget reserved for the freshest exchange.
    #[serde(default = "default_conversation_weight")]
    pub conversation_weight: f32,

    /// How many recent summaries the conversation portion considers.
    #[serde(default = "default_conversation_depth")]
    pub conversation_depth: usize,

    /// How many summaries the historical portion scans at most.
    #[serde(default = "default_historical_scan_depth")]
    pub historical_scan_depth: usize,
}

fn default_conversation_weight() -> f32 {
    0.3
}
fn default_conversation_depth() -> usize {
    5
}
fn default_historical_scan_depth() -> usize {
    200
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            conversation_weight: default_conversation_weight(),
            conversation_depth: default_conversation_depth(),
            historical_scan_depth: default_historical_scan_depth(),
        }
    }
}

/// Relatedness scoring weights for thread grouping.
///
/// These are hand-tuned values carried over as defaults; retuning decay or
/// weights is a configuration change, not a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadingConfig {
    /// Consecutive relatedness below this starts a new thread.
    #[serde(default = "default_relatedness_threshold")]
    pub relatedness_threshold: f32,

    /// Weight of the temporal-decay component.
    #[serde(default = "default_temporal_weight")]
    pub temporal_weight: f32,

    /// Weight of the non-stopword Jaccard component.
    #[serde(default = "default_content_weight")]
    pub content_weight: f32,

    /// Bonus when both records share an owner key.
    #[serde(default = "default_same_owner_bonus")]
    pub same_owner_bonus: f32,

    /// Bonus when the records come from different owners.
    #[serde(default = "default_cross_owner_bonus")]
    pub cross_owner_bonus: f32,

    /// Bonus per shared capitalized token (shared entity names).
    #[serde(default = "default_shared_name_bonus")]
    pub shared_name_bonus: f32,
}

fn default_relatedness_threshold() -> f32 {
    0.3
}
fn default_temporal_weight() -> f32 {
    0.4
}
fn default_content_weight() -> f32 {
    0.3
}
fn default_same_owner_bonus() -> f32 {
    0.3
}
fn default_cross_owner_bonus() -> f32 {
    0.1
}
fn default_shared_name_bonus() -> f32 {
    0.1
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            relatedness_threshold: default_relatedness_threshold(),
            temporal_weight: default_temporal_weight(),
            content_weight: default_content_weight(),
            same_owner_bonus: default_same_owner_bonus(),
            cross_owner_bonus: default_cross_owner_bonus(),
            shared_name_bonus: default_shared_name_bonus(),
        }
    }
}

/// Semantic memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Master switch. Disabled mode is indistinguishable from "no relevant
    /// memories found" at every call site.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum cosine similarity for a memory to be returned.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,

    /// Maximum memories returned per search.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_relevance_threshold() -> f32 {
    0.7
}
fn default_top_k() -> usize {
    3
}
fn default_true() -> bool {
    true
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            relevance_threshold: default_relevance_threshold(),
            top_k: default_top_k(),
        }
    }
}

/// Entity profile settings, including the trait-increment constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// How long a cached profile stays fresh.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Character cap for the combined entity-context block in a prompt.
    #[serde(default = "default_blurb_max_chars")]
    pub blurb_max_chars: usize,

    /// How many mentioned entities get a context blurb.
    #[serde(default = "default_max_entities")]
    pub max_entities: usize,

    /// Trait bump per taming event.
    #[serde(default = "default_taming_increment")]
    pub taming_increment: f32,

    /// Trait bump per building event.
    #[serde(default = "default_building_increment")]
    pub building_increment: f32,

    /// Trait bump per PvP-flavored death.
    #[serde(default = "default_minor_increment")]
    pub pvp_increment: f32,

    /// Trait bump per chat event.
    #[serde(default = "default_minor_increment")]
    pub chat_increment: f32,
}

fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_blurb_max_chars() -> usize {
    500
}
fn default_max_entities() -> usize {
    5
}
fn default_taming_increment() -> f32 {
    0.1
}
fn default_building_increment() -> f32 {
    0.1
}
fn default_minor_increment() -> f32 {
    0.05
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            blurb_max_chars: default_blurb_max_chars(),
            max_entities: default_max_entities(),
            taming_increment: default_taming_increment(),
            building_increment: default_building_increment(),
            pvp_increment: default_minor_increment(),
            chat_increment: default_minor_increment(),
        }
    }
}

/// Context assembler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Per-tier retrieval timeout. A tier that overruns it degrades.
    #[serde(default = "default_tier_timeout_secs")]
    pub tier_timeout_secs: u64,
}

fn default_tier_timeout_secs() -> u64 {
    3
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            tier_timeout_secs: default_tier_timeout_secs(),
        }
    }
}

/// Generation/embedding backend settings (Ollama-compatible endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the backend.
    #[serde(default = "default_provider_url")]
    pub url: String,

    /// Generation model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Request timeout for generation calls.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Penalty against repeating recent output.
    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f32,
}

fn default_provider_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "llama3".into()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}
fn default_provider_timeout_secs() -> u64 {
    120
}
fn default_temperature() -> f32 {
    0.8
}
fn default_repeat_penalty() -> f32 {
    1.15
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: default_provider_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_provider_timeout_secs(),
            temperature: default_temperature(),
            repeat_penalty: default_repeat_penalty(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.logbard/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `LOGBARD_DB_PATH`
    /// - `LOGBARD_PROVIDER_URL`
    /// - `LOGBARD_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(db_path) = std::env::var("LOGBARD_DB_PATH") {
            config.db_path = db_path;
        }
        if let Ok(url) = std::env::var("LOGBARD_PROVIDER_URL") {
            config.provider.url = url;
        }
        if let Ok(model) = std::env::var("LOGBARD_MODEL") {
            config.provider.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".logbard")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.budget.min_output_tokens > self.budget.max_output_tokens {
            return Err(ConfigError::ValidationError(
                "budget.min_output_tokens must not exceed budget.max_output_tokens".into(),
            ));
        }

        if self.budget.safety_buffer >= self.budget.context_window {
            return Err(ConfigError::ValidationError(
                "budget.safety_buffer must be smaller than budget.context_window".into(),
            ));
        }

        if !(0.0..1.0).contains(&self.history.conversation_weight) {
            return Err(ConfigError::ValidationError(
                "history.conversation_weight must be in [0.0, 1.0)".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.memory.relevance_threshold) {
            return Err(ConfigError::ValidationError(
                "memory.relevance_threshold must be in [0.0, 1.0]".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.threading.relatedness_threshold) {
            return Err(ConfigError::ValidationError(
                "threading.relatedness_threshold must be in [0.0, 1.0]".into(),
            ));
        }

        if self.provider.temperature < 0.0 || self.provider.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `logbard init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            budget: BudgetConfig::default(),
            history: HistoryConfig::default(),
            threading: ThreadingConfig::default(),
            memory: MemoryConfig::default(),
            profiles: ProfilesConfig::default(),
            assembler: AssemblerConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
