//! Learning from user feedback
//!
//! Ratings given in learning mode grow the question/answer dataset and,
//! optionally, a SQLite ratings log.

pub mod feedback;
pub mod ratings;

pub use feedback::{Band, FeedbackLoop, FeedbackOutcome, FeedbackPrompt};
pub use ratings::{RatingRecord, RatingStore};
