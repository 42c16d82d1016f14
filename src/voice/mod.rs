//! Voice Module
//!
//! - Kokoro TTS over HTTP (speech output)
//! - faster-whisper subprocess (speech-to-text)
//! - Audio I/O via cpal/rodio (feature `voice`)
//! - Terminal avatar animated while a reply plays

pub mod avatar;
pub mod input;
pub mod output;
pub mod stt;
pub mod tts;
pub mod wav;
#[cfg(feature = "voice")]
pub mod audio;

pub use avatar::AvatarAnimation;
pub use input::SpeechInput;
pub use output::SilentOutput;
#[cfg(feature = "voice")]
pub use output::VoiceOutput;
