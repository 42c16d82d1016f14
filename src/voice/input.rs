//! Spoken input: microphone capture followed by transcription
//!
//! Every failure, including an empty transcript, becomes
//! [`Utterance::Unrecognized`] so the session can keep going.

use tracing::{info, warn};

use crate::config::VoiceConfig;
use crate::error::ChatError;
use crate::types::Utterance;
use crate::voice::stt::{LocalStt, STT_SAMPLE_RATE};

pub struct SpeechInput {
    stt: LocalStt,
    record_seconds: f64,
}

impl SpeechInput {
    pub fn new(stt: LocalStt, record_seconds: f64) -> Self {
        Self { stt, record_seconds }
    }

    pub fn from_config(config: &VoiceConfig) -> Self {
        Self::new(LocalStt::from_config(config), config.record_seconds)
    }

    /// Record one utterance and transcribe it
    pub async fn listen(&self) -> Utterance {
        match self.capture().await {
            Ok(text) if !text.trim().is_empty() => Utterance::Spoken(text),
            Ok(_) => {
                info!("Transcript empty");
                Utterance::Unrecognized
            }
            Err(e) => {
                warn!(error = %e, "Speech input failed");
                Utterance::Unrecognized
            }
        }
    }

    async fn capture(&self) -> Result<String, ChatError> {
        let seconds = self.record_seconds;
        let samples = tokio::task::spawn_blocking(move || record(seconds))
            .await
            .map_err(|e| ChatError::SpeechRecognition(format!("capture task failed: {}", e)))?
            .map_err(|e| ChatError::SpeechRecognition(format!("{:#}", e)))?;

        self.stt
            .transcribe(&samples)
            .await
            .map_err(|e| ChatError::SpeechRecognition(format!("{:#}", e)))
    }
}

#[cfg(feature = "voice")]
fn record(seconds: f64) -> anyhow::Result<Vec<i16>> {
    crate::voice::audio::record_pcm(seconds, STT_SAMPLE_RATE)
}

#[cfg(not(feature = "voice"))]
fn record(_seconds: f64) -> anyhow::Result<Vec<i16>> {
    anyhow::bail!("microphone capture needs the `voice` feature")
}
