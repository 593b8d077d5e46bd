//! External collaborator traits.
//!
//! The assembly engine never talks to the outside world directly — log
//! acquisition, embedding, generation, and delivery are all behind these
//! traits. Implementations live in `logbard-providers` and the CLI.

use crate::error::ProviderError;
use async_trait::async_trait;

/// Produces fixed-length embedding vectors for texts.
///
/// The vector dimensionality is determined by the backend and constant for
/// the process lifetime; the semantic store rejects mismatched writes.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// The backend name (e.g., "ollama").
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError>;

    /// The embedding dimension, once known. `None` before the first
    /// successful call on backends that discover it lazily.
    fn dimension(&self) -> Option<usize>;
}

/// The text-generation collaborator.
///
/// Receives the assembled prompt and the computed generation ceiling; how
/// the call is transported is not this crate's concern.
#[async_trait]
pub trait Generator: Send + Sync {
    /// The backend name (e.g., "ollama").
    fn name(&self) -> &str;

    /// Generate a response for `prompt`, spending at most `num_predict`
    /// output tokens.
    async fn generate(
        &self,
        prompt: &str,
        num_predict: u32,
        owner_key: &str,
    ) -> std::result::Result<String, ProviderError>;

    /// Can we reach the backend?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

/// Supplies sanitized log lines per owner on each cycle.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Fetch the new lines for `owner_key` since the last call.
    async fn fetch(&self, owner_key: &str) -> std::result::Result<Vec<String>, ProviderError>;
}

/// Receives final generated text for outbound notification.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(
        &self,
        owner_key: &str,
        text: &str,
    ) -> std::result::Result<(), ProviderError>;
}
