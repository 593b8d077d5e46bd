//! Exact token counting via HuggingFace tokenizer files.
//!
//! Opt-in (`hf-tokenizer` feature): byte-exact counts for the deployed
//! model at the cost of a model-specific tokenizer file. Encoding failures
//! degrade to the character heuristic — counting never errors.

use logbard_core::token::{estimate_tokens, TokenCounter};
use tokenizers::Tokenizer;

/// A counter backed by a `tokenizer.json` file.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    /// Load a tokenizer from a file path.
    pub fn from_file(path: &str) -> Result<Self, String> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| e.to_string())?;
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HfTokenCounter {
    fn name(&self) -> &str {
        "hf-tokenizer"
    }

    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.len().max(1),
            Err(e) => {
                tracing::warn!("Exact tokenization failed ({e}); using heuristic estimate");
                estimate_tokens(text)
            }
        }
    }
}
