//! Speech sinks
//!
//! [`VoiceOutput`] synthesizes, plays and animates a reply and returns once
//! playback is over. [`SilentOutput`] is the text-only stand-in.

use anyhow::Result;
use async_trait::async_trait;

use crate::session::SpeechSink;

/// Text-only sink: the reply is already on screen, nothing to play
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentOutput;

#[async_trait]
impl SpeechSink for SilentOutput {
    async fn speak(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "voice")]
pub use spoken::VoiceOutput;

#[cfg(feature = "voice")]
mod spoken {
    use anyhow::{Context, Result};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tracing::{debug, warn};

    use crate::config::Config;
    use crate::session::SpeechSink;
    use crate::voice::audio;
    use crate::voice::avatar::AvatarAnimation;
    use crate::voice::tts::KokoroTts;
    use crate::voice::wav::pcm_to_wav;

    /// TTS + speaker playback + avatar animation
    pub struct VoiceOutput {
        tts: KokoroTts,
        avatar: AvatarAnimation,
        artifact_dir: PathBuf,
    }

    impl VoiceOutput {
        pub fn new(tts: KokoroTts, avatar: AvatarAnimation, artifact_dir: PathBuf) -> Self {
            Self { tts, avatar, artifact_dir }
        }

        pub fn from_config(config: &Config) -> Self {
            Self::new(
                KokoroTts::from_config(&config.voice),
                AvatarAnimation::from_config(&config.avatar),
                std::env::temp_dir(),
            )
        }

        fn artifact_path(&self) -> PathBuf {
            self.artifact_dir
                .join(format!("bella-response-{}.wav", uuid::Uuid::new_v4()))
        }
    }

    #[async_trait]
    impl SpeechSink for VoiceOutput {
        async fn speak(&self, text: &str) -> Result<()> {
            let pcm = self.tts.synthesize(text).await?;
            if pcm.samples.is_empty() {
                return Ok(());
            }

            let wav = pcm_to_wav(&pcm.samples, pcm.sample_rate, pcm.channels)?;
            let artifact = self.artifact_path();
            tokio::fs::write(&artifact, wav)
                .await
                .context("Failed to write speech audio")?;

            let playing = Arc::new(AtomicBool::new(true));
            self.avatar.start(playing.clone());

            let path = artifact.clone();
            let played = tokio::task::spawn_blocking(move || audio::play_file(&path)).await;
            playing.store(false, Ordering::Release);

            if let Err(e) = tokio::fs::remove_file(&artifact).await {
                warn!(error = %e, path = %artifact.display(), "Failed to remove speech audio");
            }
            debug!("Playback finished");

            played.context("Playback task failed")?
        }
    }
}
