//! Feedback Loop - turns a rating into dataset growth
//!
//! After a reply in learning mode the user rates it 1-10:
//!
//! ```text
//! rating >= 8   -> reinforce: save (question, reply)
//! rating 5..=7  -> neutral:   nothing
//! rating < 5    -> correct:   ask for a better answer, save (question, better)
//! cancelled     -> nothing
//! ```

use anyhow::Result;
use tracing::{info, warn};

use crate::dataset::{AppendOutcome, DatasetStore};
use crate::learning::ratings::RatingStore;
use crate::types::{ConversationTurn, Rating};

/// Lowest rating that reinforces the reply
pub const REINFORCE_THRESHOLD: u8 = 8;

/// Ratings below this ask for a correction
pub const CORRECT_THRESHOLD: u8 = 5;

/// Modal prompts the feedback loop needs from the front-end
#[cfg_attr(test, mockall::automock)]
pub trait FeedbackPrompt {
    /// Ask for a 1-10 rating. `None` means the user cancelled.
    fn ask_rating(&mut self) -> Result<Option<Rating>>;

    /// Ask for a better answer. `None` means the user cancelled.
    fn ask_correction(&mut self) -> Result<Option<String>>;

    /// Informational message shown to the user
    fn notify(&mut self, message: &str);
}

/// What a rating asks the loop to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Reinforce,
    Neutral,
    Correct,
}

impl Band {
    pub fn of(rating: Rating) -> Self {
        match rating.value() {
            v if v >= REINFORCE_THRESHOLD => Band::Reinforce,
            v if v < CORRECT_THRESHOLD => Band::Correct,
            _ => Band::Neutral,
        }
    }
}

/// How a feedback round ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// No rating given
    Cancelled,
    /// Rating in the neutral band
    Neutral(Rating),
    /// Reply saved (or skipped as a duplicate)
    Reinforced { rating: Rating, append: AppendOutcome },
    /// Correction saved (or skipped as a duplicate)
    Corrected { rating: Rating, append: AppendOutcome },
    /// Low rating but no correction supplied
    NoCorrection(Rating),
    /// Dataset file could not be written
    SaveFailed(Rating),
}

/// Runs one rating round per learning-mode turn
#[derive(Default)]
pub struct FeedbackLoop {
    ratings: Option<RatingStore>,
}

impl FeedbackLoop {
    pub fn new() -> Self {
        Self { ratings: None }
    }

    /// Also log every rating to `ratings`
    pub fn with_ratings(ratings: RatingStore) -> Self {
        Self { ratings: Some(ratings) }
    }

    pub fn ratings(&self) -> Option<&RatingStore> {
        self.ratings.as_ref()
    }

    /// Ask for a rating of `turn` and apply it to `dataset`
    pub fn run<P: FeedbackPrompt + ?Sized>(
        &self,
        dataset: &mut DatasetStore,
        turn: &ConversationTurn,
        prompt: &mut P,
    ) -> FeedbackOutcome {
        prompt.notify("Please rate the response (1-10):");

        let rating = match prompt.ask_rating() {
            Ok(Some(rating)) => rating,
            Ok(None) => return FeedbackOutcome::Cancelled,
            Err(e) => {
                warn!(error = %e, "Rating prompt failed, treating as cancelled");
                return FeedbackOutcome::Cancelled;
            }
        };

        self.log_rating(turn, rating);

        match Band::of(rating) {
            Band::Neutral => FeedbackOutcome::Neutral(rating),
            Band::Reinforce => match save(dataset, &turn.user_input, &turn.resolved_answer, prompt) {
                Some(append) => FeedbackOutcome::Reinforced { rating, append },
                None => FeedbackOutcome::SaveFailed(rating),
            },
            Band::Correct => {
                let better = match prompt.ask_correction() {
                    Ok(better) => better,
                    Err(e) => {
                        warn!(error = %e, "Correction prompt failed, treating as cancelled");
                        None
                    }
                };
                match better.filter(|b| !b.trim().is_empty()) {
                    Some(better) => match save(dataset, &turn.user_input, &better, prompt) {
                        Some(append) => FeedbackOutcome::Corrected { rating, append },
                        None => FeedbackOutcome::SaveFailed(rating),
                    },
                    None => FeedbackOutcome::NoCorrection(rating),
                }
            }
        }
    }

    fn log_rating(&self, turn: &ConversationTurn, rating: Rating) {
        let Some(store) = &self.ratings else { return };
        if let Err(e) = store.record(&turn.user_input, &turn.resolved_answer, rating) {
            warn!(error = %e, "Failed to record rating");
        }
    }
}

fn save<P: FeedbackPrompt + ?Sized>(
    dataset: &mut DatasetStore,
    question: &str,
    answer: &str,
    prompt: &mut P,
) -> Option<AppendOutcome> {
    match dataset.append(question, answer) {
        Ok(AppendOutcome::Saved) => {
            info!(question = %question.to_lowercase(), "Learned new answer");
            Some(AppendOutcome::Saved)
        }
        Ok(AppendOutcome::Skipped) => {
            prompt.notify(&format!(
                "Question '{}' already exists in the dataset. Skipping save.",
                question.to_lowercase()
            ));
            Some(AppendOutcome::Skipped)
        }
        Err(e) => {
            warn!(error = %e, "Failed to save dataset entry");
            prompt.notify(&format!("Could not save to the dataset: {}", e));
            None
        }
    }
}
