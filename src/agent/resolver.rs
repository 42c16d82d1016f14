//! Response Resolver - dataset keyword match with generative fallback
//!
//! A stored question matches when every one of its whitespace tokens occurs
//! somewhere in the lower-cased input as a plain substring. Order and word
//! boundaries are ignored, so `"cat food"` also matches
//! `"scatter foodstuff"`. The first matching key in dataset order wins.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::dataset::{DatasetEntry, DatasetStore};
use crate::error::ChatError;
use crate::types::Reply;

/// Generation knobs passed to the collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    pub max_length: u32,
    pub num_return_sequences: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 30,
            num_return_sequences: 1,
        }
    }
}

impl From<&GeneratorConfig> for GenerationParams {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            max_length: config.max_length,
            num_return_sequences: config.num_return_sequences,
        }
    }
}

/// One generation candidate
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedText {
    pub generated_text: String,
}

/// Generative-text capability used when the dataset has no match
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Vec<GeneratedText>, ChatError>;
}

/// Decides between a dataset answer and a generated one
pub struct ResponseResolver {
    generator: Arc<dyn TextGenerator>,
    params: GenerationParams,
}

impl ResponseResolver {
    pub fn new(generator: Arc<dyn TextGenerator>, params: GenerationParams) -> Self {
        Self { generator, params }
    }

    /// Resolve a reply for `input`. Never fails: a generator error or an
    /// empty candidate list becomes an empty generated reply.
    pub async fn resolve(&self, dataset: &DatasetStore, input: &str) -> Reply {
        if let Some(entry) = keyword_match(dataset.entries(), input) {
            debug!(question = %entry.question, "Dataset keyword match");
            return Reply::dataset(entry.answer.clone());
        }

        match self.generator.generate(input, &self.params).await {
            Ok(candidates) => {
                let text = candidates
                    .into_iter()
                    .next()
                    .map(|c| c.generated_text.trim().to_string())
                    .unwrap_or_default();
                Reply::generated(text)
            }
            Err(e) => {
                warn!(error = %e, "Text generation failed, replying with empty text");
                Reply::generated(String::new())
            }
        }
    }
}

/// First entry whose question tokens all occur as substrings of `input`
pub fn keyword_match<'a>(
    entries: impl IntoIterator<Item = &'a DatasetEntry>,
    input: &str,
) -> Option<&'a DatasetEntry> {
    let input = input.to_lowercase();
    entries
        .into_iter()
        .find(|entry| entry.question.split_whitespace().all(|token| input.contains(token)))
}
