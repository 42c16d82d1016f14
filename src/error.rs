//! Domain error taxonomy
//!
//! Only `DatasetLoad` is fatal. Everything else is recovered by the layer
//! that sees it first and at most logged.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Dataset file missing, unreadable or malformed at startup
    #[error("failed to load dataset {path}: {reason}")]
    DatasetLoad { path: PathBuf, reason: String },

    /// Appending a row to the dataset file failed
    #[error("failed to write dataset {path}: {source}")]
    DatasetWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Audio capture or transcription failed
    #[error("speech recognition failed: {0}")]
    SpeechRecognition(String),

    /// The generative-text endpoint failed
    #[error("text generation failed: {0}")]
    Generation(String),

    /// Ratings database error
    #[error("ratings store error: {0}")]
    Ratings(#[from] rusqlite::Error),
}

impl ChatError {
    pub(crate) fn dataset_load(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        ChatError::DatasetLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
