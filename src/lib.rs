//! Bella - dataset-first chat companion
//!
//! - Question/answer dataset in a CSV file, matched by keyword subset
//! - Generative fallback through a Hugging Face compatible endpoint
//! - Learning mode: rate replies 1-10 to grow the dataset
//! - Optional voice: Kokoro TTS, faster-whisper STT, speaking avatar
//!
//! # Example
//!
//! ```ignore
//! use bella_chat::agent::{HuggingFaceGenerator, ResponseResolver, GenerationParams};
//! use bella_chat::config::Config;
//! use bella_chat::dataset::DatasetStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let dataset = DatasetStore::load(&config.dataset.path)?;
//!     let generator = HuggingFaceGenerator::from_config(&config.generator)?;
//!     let resolver = ResponseResolver::new(Arc::new(generator), GenerationParams::default());
//!     let reply = resolver.resolve(&dataset, "hello there").await;
//!     println!("{}", reply.text);
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod error;
pub mod config;
pub mod dataset;
pub mod agent;
pub mod learning;
pub mod session;
pub mod security;
pub mod voice;
pub mod cli;

pub use agent::{HuggingFaceGenerator, ResponseResolver, TextGenerator};
pub use config::Config;
pub use dataset::{AppendOutcome, DatasetStore};
pub use error::ChatError;
pub use learning::{FeedbackLoop, FeedbackOutcome, FeedbackPrompt, RatingStore};
pub use session::{Frontend, SessionController, SpeechSink, TurnOutcome};
pub use types::{ConversationTurn, Mode, Rating, Reply, ResponseSource, Utterance};

pub use security::{
    set_hf_api_key,
    get_hf_api_key,
    delete_hf_api_key,
    has_hf_api_key,
    load_api_key,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - dataset-first chat companion", NAME, VERSION)
}
