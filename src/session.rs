//! Session Controller - sequences one conversation turn
//!
//! ```text
//! Utterance -> farewell? -> Resolver -> show + speak -> (learning) Feedback Loop
//! ```
//!
//! Exactly one turn runs at a time: the next utterance is only read after
//! `handle_turn` returns, and `handle_turn` only returns after the speech
//! sink has finished playing. The dataset is therefore mutated by a single
//! writer and needs no locking.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agent::ResponseResolver;
use crate::dataset::DatasetStore;
use crate::learning::{FeedbackLoop, FeedbackOutcome, FeedbackPrompt};
use crate::types::{ConversationTurn, Mode, Utterance};

/// Substrings that end the session
pub const FAREWELL_PHRASES: &[&str] = &["goodbye", "bye", "see you", "farewell", "later", "ciao", "adios"];

/// Spoken before the session ends
pub const FAREWELL_LINE: &str = "Goodbye! Have a great day!";

/// Spoken when speech recognition produced nothing usable
pub const NOT_UNDERSTOOD_LINE: &str = "Sorry, I did not understand that.";

/// Speech output. `speak` returns once playback has finished.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn speak(&self, text: &str) -> anyhow::Result<()>;
}

/// Everything the controller shows to or asks of the user
pub trait Frontend: FeedbackPrompt {
    /// Display Bella's reply
    fn show_reply(&mut self, text: &str);
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input, nothing done
    Ignored,
    /// Speech recognition failed; apology spoken
    NotUnderstood,
    /// Farewell detected; the session should end
    Farewell,
    /// Reply given, with the feedback result in learning mode
    Answered {
        turn: ConversationTurn,
        feedback: Option<FeedbackOutcome>,
    },
}

impl TurnOutcome {
    pub fn ends_session(&self) -> bool {
        matches!(self, TurnOutcome::Farewell)
    }
}

/// `true` when `input` contains any farewell phrase
pub fn is_farewell(input: &str) -> bool {
    let input = input.to_lowercase();
    FAREWELL_PHRASES.iter().any(|phrase| input.contains(phrase))
}

/// Owns the conversation state for one session
pub struct SessionController {
    dataset: DatasetStore,
    resolver: ResponseResolver,
    feedback: FeedbackLoop,
    speech: Arc<dyn SpeechSink>,
    mode: Mode,
}

impl SessionController {
    pub fn new(
        dataset: DatasetStore,
        resolver: ResponseResolver,
        feedback: FeedbackLoop,
        speech: Arc<dyn SpeechSink>,
        mode: Mode,
    ) -> Self {
        Self {
            dataset,
            resolver,
            feedback,
            speech,
            mode,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Flip between learning and talking mode and tell the user
    pub fn toggle_mode<F: Frontend + ?Sized>(&mut self, frontend: &mut F) -> Mode {
        self.mode = self.mode.toggled();
        info!(mode = %self.mode, "Mode switched");
        frontend.notify(&format!("Switched to {}", self.mode));
        self.mode
    }

    pub fn dataset(&self) -> &DatasetStore {
        &self.dataset
    }

    /// Run one conversation turn
    pub async fn handle_turn<F: Frontend + ?Sized>(&mut self, utterance: Utterance, frontend: &mut F) -> TurnOutcome {
        let Some(input) = utterance.text() else {
            debug!("Utterance not recognized");
            frontend.show_reply(NOT_UNDERSTOOD_LINE);
            self.say(NOT_UNDERSTOOD_LINE).await;
            return TurnOutcome::NotUnderstood;
        };

        if input.trim().is_empty() {
            return TurnOutcome::Ignored;
        }

        if is_farewell(input) {
            info!("Farewell detected, ending session");
            frontend.show_reply(FAREWELL_LINE);
            self.say(FAREWELL_LINE).await;
            return TurnOutcome::Farewell;
        }

        let reply = self.resolver.resolve(&self.dataset, input).await;
        debug!(source = %reply.source, "Resolved reply");

        let turn = ConversationTurn {
            user_input: input.to_string(),
            resolved_answer: reply.text,
            source: reply.source,
        };

        frontend.show_reply(&turn.resolved_answer);
        self.say(&turn.resolved_answer).await;

        let feedback = match self.mode {
            Mode::Learning => Some(self.feedback.run(&mut self.dataset, &turn, frontend)),
            Mode::Talking => None,
        };

        TurnOutcome::Answered { turn, feedback }
    }

    async fn say(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Err(e) = self.speech.speak(text).await {
            warn!(error = %e, "Speech output failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::resolver::{GeneratedText, GenerationParams, MockTextGenerator};
    use crate::types::{Rating, ResponseSource};
    use anyhow::Result;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeFrontend {
        ratings: VecDeque<Option<u8>>,
        corrections: VecDeque<Option<String>>,
        replies: Vec<String>,
        notices: Vec<String>,
    }

    impl FeedbackPrompt for FakeFrontend {
        fn ask_rating(&mut self) -> Result<Option<Rating>> {
            Ok(self.ratings.pop_front().flatten().and_then(Rating::new))
        }

        fn ask_correction(&mut self) -> Result<Option<String>> {
            Ok(self.corrections.pop_front().flatten())
        }

        fn notify(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }
    }

    impl Frontend for FakeFrontend {
        fn show_reply(&mut self, text: &str) {
            self.replies.push(text.to_string());
        }
    }

    fn dataset(rows: &str) -> (TempDir, DatasetStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.csv");
        std::fs::write(&path, format!("question,answer\n{}", rows)).unwrap();
        let store = DatasetStore::load(&path).unwrap();
        (dir, store)
    }

    fn generator(text: &'static str) -> MockTextGenerator {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().returning(move |_, _| {
            Ok(vec![GeneratedText {
                generated_text: text.to_string(),
            }])
        });
        generator
    }

    fn controller(store: DatasetStore, generator: MockTextGenerator, speech: MockSpeechSink, mode: Mode) -> SessionController {
        SessionController::new(
            store,
            ResponseResolver::new(Arc::new(generator), GenerationParams::default()),
            FeedbackLoop::new(),
            Arc::new(speech),
            mode,
        )
    }

    fn speech_expecting(line: &'static str) -> MockSpeechSink {
        let mut speech = MockSpeechSink::new();
        speech
            .expect_speak()
            .withf(move |text| text.to_string() == line)
            .times(1)
            .returning(|_| Ok(()));
        speech
    }

    #[test]
    fn test_is_farewell() {
        assert!(is_farewell("ok bye now"));
        assert!(is_farewell("See You tomorrow"));
        assert!(is_farewell("talk to you LATER"));
        assert!(!is_farewell("hello there"));
    }

    #[tokio::test]
    async fn test_farewell_ends_session_in_both_modes() {
        for mode in [Mode::Talking, Mode::Learning] {
            let (_dir, store) = dataset("");
            let mut generator = MockTextGenerator::new();
            generator.expect_generate().never();
            let mut session = controller(store, generator, speech_expecting(FAREWELL_LINE), mode);
            let mut frontend = FakeFrontend::default();

            let outcome = session.handle_turn(Utterance::Typed("ok bye now".into()), &mut frontend).await;

            assert_eq!(outcome, TurnOutcome::Farewell);
            assert!(outcome.ends_session());
            assert_eq!(frontend.replies, vec![FAREWELL_LINE]);
        }
    }

    #[tokio::test]
    async fn test_dataset_reply_is_shown_and_spoken() {
        let (_dir, store) = dataset("your name,I am Bella\n");
        let mut session = controller(store, MockTextGenerator::new(), speech_expecting("I am Bella"), Mode::Talking);
        let mut frontend = FakeFrontend::default();

        let outcome = session.handle_turn(Utterance::Typed("What is your name?".into()), &mut frontend).await;

        match outcome {
            TurnOutcome::Answered { turn, feedback } => {
                assert_eq!(turn.resolved_answer, "I am Bella");
                assert_eq!(turn.source, ResponseSource::Dataset);
                assert!(feedback.is_none());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(frontend.replies, vec!["I am Bella"]);
    }

    #[tokio::test]
    async fn test_learning_mode_reinforces_generated_reply() {
        let (_dir, store) = dataset("");
        let mut session = controller(store, generator(" Rust is fun "), speech_expecting("Rust is fun"), Mode::Learning);
        let mut frontend = FakeFrontend {
            ratings: VecDeque::from([Some(9)]),
            ..Default::default()
        };

        let outcome = session.handle_turn(Utterance::Spoken("Tell me about Rust".into()), &mut frontend).await;

        assert!(matches!(outcome, TurnOutcome::Answered { feedback: Some(FeedbackOutcome::Reinforced { .. }), .. }));
        assert_eq!(session.dataset().lookup("tell me about rust"), Some("Rust is fun"));
    }

    #[tokio::test]
    async fn test_unrecognized_speech_is_not_resolved() {
        let (_dir, store) = dataset("sorry,This should not match\n");
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();
        let mut session = controller(store, generator, speech_expecting(NOT_UNDERSTOOD_LINE), Mode::Learning);
        let mut frontend = FakeFrontend::default();

        let outcome = session.handle_turn(Utterance::Unrecognized, &mut frontend).await;

        assert_eq!(outcome, TurnOutcome::NotUnderstood);
        assert_eq!(frontend.replies, vec![NOT_UNDERSTOOD_LINE]);
        assert!(frontend.notices.is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let (_dir, store) = dataset("");
        let mut speech = MockSpeechSink::new();
        speech.expect_speak().never();
        let mut session = controller(store, MockTextGenerator::new(), speech, Mode::Learning);
        let mut frontend = FakeFrontend::default();

        let outcome = session.handle_turn(Utterance::Typed("   ".into()), &mut frontend).await;
        assert_eq!(outcome, TurnOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_speech_failure_does_not_break_turn() {
        let (_dir, store) = dataset("hello,Hi!\n");
        let mut speech = MockSpeechSink::new();
        speech
            .expect_speak()
            .returning(|_| Err(anyhow::anyhow!("no audio device")));
        let mut session = controller(store, MockTextGenerator::new(), speech, Mode::Talking);
        let mut frontend = FakeFrontend::default();

        let outcome = session.handle_turn(Utterance::Typed("hello".into()), &mut frontend).await;
        assert!(matches!(outcome, TurnOutcome::Answered { .. }));
    }

    #[tokio::test]
    async fn test_toggle_mode_notifies() {
        let (_dir, store) = dataset("");
        let mut session = controller(store, MockTextGenerator::new(), MockSpeechSink::new(), Mode::Talking);
        let mut frontend = FakeFrontend::default();

        assert_eq!(session.toggle_mode(&mut frontend), Mode::Learning);
        assert_eq!(session.toggle_mode(&mut frontend), Mode::Talking);
        assert_eq!(frontend.notices, vec!["Switched to Learning Mode", "Switched to Talking Mode"]);
    }
}
