//! Text-to-speech client for a Kokoro-compatible HTTP server
//!
//! The server exposes an OpenAI-style `/v1/audio/speech` endpoint. We ask
//! for WAV and decode it to Int16 PCM for playback.

use anyhow::{Result, Context};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, debug};

use super::wav::{wav_to_pcm, Pcm};

/// TTS client
pub struct KokoroTts {
    /// Base URL of the TTS server
    base_url: String,
    /// Voice name (e.g., "af_heart")
    voice: String,
    client: Client,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

impl KokoroTts {
    pub fn new(base_url: &str, voice: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            voice: voice.to_string(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &crate::config::VoiceConfig) -> Self {
        Self::new(&config.tts_url, &config.tts_voice)
    }

    /// Synthesize `text` to PCM. Empty text yields no samples.
    pub async fn synthesize(&self, text: &str) -> Result<Pcm> {
        if text.trim().is_empty() {
            return Ok(Pcm { samples: Vec::new(), sample_rate: 24000, channels: 1 });
        }

        debug!("TTS synthesizing {} chars", text.len());

        let request = SpeechRequest {
            model: "kokoro",
            input: text,
            voice: &self.voice,
            response_format: "wav",
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .context("Failed to connect to TTS server")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("TTS error ({}): {}", status, body);
        }

        let wav_bytes = response
            .bytes()
            .await
            .context("Failed to read TTS response")?;

        let pcm = wav_to_pcm(&wav_bytes)?;
        info!(
            "TTS produced {} samples ({:.1}s at {}Hz)",
            pcm.samples.len(),
            pcm.samples.len() as f64 / (pcm.sample_rate as f64 * pcm.channels as f64),
            pcm.sample_rate
        );
        Ok(pcm)
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/speech", self.base_url)
    }
}
