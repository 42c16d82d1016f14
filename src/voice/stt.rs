//! Speech-to-text through a faster-whisper subprocess
//!
//! PCM is wrapped in WAV, base64-encoded and written to the script's stdin.
//! The script prints `{"text": "...", "error": "..."}` on stdout.

use anyhow::{Result, Context};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, debug};

use super::wav::pcm_to_wav;

/// Sample rate the transcriber expects
pub const STT_SAMPLE_RATE: u32 = 16000;

/// faster-whisper client
pub struct LocalStt {
    /// Whisper model size (tiny, base, small, medium, large-v3)
    model: String,
    python: PathBuf,
    script_path: PathBuf,
    timeout: Duration,
}

impl LocalStt {
    pub fn new(model: &str, python: PathBuf, script_path: PathBuf) -> Self {
        Self {
            model: model.to_string(),
            python,
            script_path,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &crate::config::VoiceConfig) -> Self {
        Self::new(&config.whisper_model, config.python.clone(), config.whisper_script.clone())
    }

    /// Transcribe 16kHz mono samples. Silence transcribes to an empty string.
    pub async fn transcribe(&self, pcm_samples: &[i16]) -> Result<String> {
        if pcm_samples.is_empty() {
            return Ok(String::new());
        }

        debug!("Transcribing {} samples ({:.1}s of audio)",
            pcm_samples.len(),
            pcm_samples.len() as f64 / STT_SAMPLE_RATE as f64
        );

        let wav_bytes = pcm_to_wav(pcm_samples, STT_SAMPLE_RATE, 1)?;
        let audio_b64 = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            &wav_bytes,
        );

        self.run_whisper(&audio_b64).await
    }

    async fn run_whisper(&self, audio_b64: &str) -> Result<String> {
        use tokio::io::AsyncWriteExt;

        info!(model = %self.model, "Running faster-whisper");

        let mut child = tokio::process::Command::new(&self.python)
            .arg(&self.script_path)
            .arg("-")  // read from stdin
            .arg(&self.model)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn faster-whisper process")?;

        let mut stdin = child.stdin.take().context("No stdin for faster-whisper")?;
        let b64_owned = audio_b64.to_string();
        tokio::spawn(async move {
            let _ = stdin.write_all(b64_owned.as_bytes()).await;
            let _ = stdin.shutdown().await;
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| anyhow::anyhow!("Transcription timeout ({}s)", self.timeout.as_secs()))?
            .context("Failed to wait for faster-whisper")?;

        if !output.status.success() {
            anyhow::bail!("faster-whisper error: {}", String::from_utf8_lossy(&output.stderr));
        }

        parse_transcript(&output.stdout)
    }
}

fn parse_transcript(stdout: &[u8]) -> Result<String> {
    let result: serde_json::Value = serde_json::from_slice(stdout)
        .context("Failed to parse transcription result")?;

    if let Some(error) = result.get("error").and_then(|e| e.as_str()) {
        if !error.is_empty() {
            anyhow::bail!("Transcription error: {}", error);
        }
    }

    let text = result
        .get("text")
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    info!("Transcribed: \"{}\"", text);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcript() {
        assert_eq!(parse_transcript(br#"{"text": "  hello bella "}"#).unwrap(), "hello bella");
        assert_eq!(parse_transcript(br#"{"text": "hi", "error": ""}"#).unwrap(), "hi");
    }

    #[test]
    fn test_parse_transcript_error() {
        assert!(parse_transcript(br#"{"error": "model missing"}"#).is_err());
        assert!(parse_transcript(b"Traceback").is_err());
    }

    #[tokio::test]
    async fn test_empty_audio_skips_subprocess() {
        let stt = LocalStt::new("base", PathBuf::from("/nonexistent/python"), PathBuf::from("x.py"));
        assert_eq!(stt.transcribe(&[]).await.unwrap(), "");
    }
}
