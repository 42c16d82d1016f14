//! Agent module - reply resolution and the generative-text client

pub mod llm;
pub mod resolver;

pub use llm::HuggingFaceGenerator;
pub use resolver::{keyword_match, GeneratedText, GenerationParams, ResponseResolver, TextGenerator};
