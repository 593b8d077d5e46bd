//! Ollama-compatible HTTP collaborators.
//!
//! Two thin clients against a local Ollama endpoint: `/api/generate` for
//! text generation with an explicit `num_predict` ceiling, and
//! `/api/embeddings` for embedding vectors. The context window (`num_ctx`)
//! rides along on every generation request so the server's view of the
//! window matches the budget planner's.

use async_trait::async_trait;
use logbard_config::ProviderConfig;
use logbard_core::collaborator::{Embedder, Generator};
use logbard_core::error::ProviderError;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Generation client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    num_ctx: usize,
    temperature: f32,
    repeat_penalty: f32,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

impl OllamaGenerator {
    /// Create a generator from provider configuration.
    ///
    /// `num_ctx` must be the same context window the budget planner uses.
    pub fn new(cfg: &ProviderConfig, num_ctx: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: cfg.url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            num_ctx,
            temperature: cfg.temperature,
            repeat_penalty: cfg.repeat_penalty,
            client,
        }
    }

    fn request_body(&self, prompt: &str, num_predict: u32) -> serde_json::Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "num_ctx": self.num_ctx,
                "num_predict": num_predict,
                "temperature": self.temperature,
                "repeat_penalty": self.repeat_penalty,
            },
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(
        &self,
        prompt: &str,
        num_predict: u32,
        owner_key: &str,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(
            "Generation request for {owner_key}: model={}, num_predict={num_predict}",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(prompt, num_predict))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, "Generation request failed: {body}");
            return Err(map_status(status, body));
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse generate response: {e}"),
            })?;

        Ok(parsed.response.trim().to_string())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;
        Ok(response.status().is_success())
    }
}

/// Embedding client for an Ollama-compatible `/api/embeddings` endpoint.
///
/// The vector dimension is discovered on the first successful call and
/// reported through `dimension()` from then on.
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
    dimension: AtomicUsize,
}

impl OllamaEmbedder {
    pub fn new(cfg: &ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: cfg.url.trim_end_matches('/').to_string(),
            model: cfg.embedding_model.clone(),
            client,
            dimension: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "model": self.model, "prompt": text }))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            // A missing embedding model is permanent, not transient; the
            // semantic engine latches disabled on NotConfigured.
            if status == 404 {
                return Err(ProviderError::NotConfigured(format!(
                    "embedding model '{}' not found: {body}",
                    self.model
                )));
            }
            return Err(map_status(status, body));
        }

        let parsed: EmbeddingsResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse embeddings response: {e}"),
            })?;

        if parsed.embedding.is_empty() {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: "Empty embedding vector returned".into(),
            });
        }

        self.dimension
            .store(parsed.embedding.len(), Ordering::Relaxed);
        Ok(parsed.embedding)
    }

    fn dimension(&self) -> Option<usize> {
        match self.dimension.load(Ordering::Relaxed) {
            0 => None,
            d => Some(d),
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

fn map_status(status: u16, body: String) -> ProviderError {
    ProviderError::ApiError {
        status_code: status,
        message: body,
    }
}
