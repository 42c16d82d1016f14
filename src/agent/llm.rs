//! Generative-text client for Hugging Face compatible inference endpoints
//!
//! Sends `{"inputs", "parameters"}` to `<base_url>/models/<model>` and reads
//! back a list of `{"generated_text"}` candidates.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::resolver::{GeneratedText, GenerationParams, TextGenerator};
use crate::config::GeneratorConfig;
use crate::error::ChatError;

/// Text-generation client
#[derive(Clone)]
pub struct HuggingFaceGenerator {
    client: Arc<Client>,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: RequestParameters,
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct RequestParameters {
    max_length: u32,
    num_return_sequences: u32,
    truncation: bool,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

/// Endpoints answer either with candidates or with `{"error": ...}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Candidates(Vec<GeneratedText>),
    Error { error: String },
}

impl HuggingFaceGenerator {
    /// Create a client for `model` at `base_url`
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Generation(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    /// Create from config, reading the API key from the keyring when present
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, ChatError> {
        Self::new(
            &config.base_url,
            &config.model,
            crate::security::load_api_key(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceGenerator {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Vec<GeneratedText>, ChatError> {
        debug!(model = %self.model, "Requesting generation for {} chars", prompt.len());

        let request = GenerationRequest {
            inputs: prompt,
            parameters: RequestParameters {
                max_length: params.max_length,
                num_return_sequences: params.num_return_sequences,
                truncation: true,
            },
            options: RequestOptions { wait_for_model: true },
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ChatError::Generation(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Generation(format!("API error ({}): {}", status, body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Generation(format!("failed to read response: {}", e)))?;

        let candidates = parse_response(&body)?;
        info!(model = %self.model, candidates = candidates.len(), "Generation complete");
        Ok(candidates)
    }
}

fn parse_response(body: &str) -> Result<Vec<GeneratedText>, ChatError> {
    match serde_json::from_str::<GenerationResponse>(body) {
        Ok(GenerationResponse::Candidates(candidates)) => Ok(candidates),
        Ok(GenerationResponse::Error { error }) => Err(ChatError::Generation(error)),
        Err(e) => Err(ChatError::Generation(format!("unexpected response: {}", e))),
    }
}
