//! External collaborator implementations for Logbard.

pub mod ollama;

pub use ollama::{OllamaEmbedder, OllamaGenerator};
