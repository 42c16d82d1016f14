//! Question/answer dataset
//!
//! The dataset is the companion's only long-term memory: a flat CSV file
//! with a `question,answer` header, mirrored into an insertion-ordered
//! in-memory mapping owned by [`DatasetStore`].

pub mod store;

pub use store::{AppendOutcome, DatasetEntry, DatasetStore};
