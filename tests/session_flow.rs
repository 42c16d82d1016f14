//! End-to-end conversation flows against a real dataset file

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use bella_chat::agent::{GeneratedText, GenerationParams, ResponseResolver, TextGenerator};
use bella_chat::dataset::{AppendOutcome, DatasetStore};
use bella_chat::error::ChatError;
use bella_chat::learning::{FeedbackLoop, FeedbackOutcome, FeedbackPrompt, RatingStore};
use bella_chat::session::{Frontend, SessionController, SpeechSink, TurnOutcome, FAREWELL_LINE, NOT_UNDERSTOOD_LINE};
use bella_chat::types::{ConversationTurn, Mode, Rating, ResponseSource, Utterance};

/// Generator that always answers with the same text, counting calls
struct FixedGenerator {
    text: Option<&'static str>,
    calls: Mutex<usize>,
}

impl FixedGenerator {
    fn answering(text: &'static str) -> Arc<Self> {
        Arc::new(Self { text: Some(text), calls: Mutex::new(0) })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self { text: None, calls: Mutex::new(0) })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl TextGenerator for FixedGenerator {
    async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<Vec<GeneratedText>, ChatError> {
        *self.calls.lock().unwrap() += 1;
        match self.text {
            Some(text) => Ok(vec![GeneratedText { generated_text: text.to_string() }]),
            None => Err(ChatError::Generation("model loading".to_string())),
        }
    }
}

/// Records everything that was spoken
#[derive(Default)]
struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSink for RecordingSpeech {
    async fn speak(&self, text: &str) -> anyhow::Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Front-end with scripted answers to the modal prompts
#[derive(Default)]
struct ScriptedFrontend {
    ratings: VecDeque<Option<u8>>,
    corrections: VecDeque<Option<String>>,
    replies: Vec<String>,
    notices: Vec<String>,
}

impl ScriptedFrontend {
    fn rating(mut self, value: u8) -> Self {
        self.ratings.push_back(Some(value));
        self
    }

    fn correction(mut self, text: &str) -> Self {
        self.corrections.push_back(Some(text.to_string()));
        self
    }
}

impl FeedbackPrompt for ScriptedFrontend {
    fn ask_rating(&mut self) -> anyhow::Result<Option<Rating>> {
        Ok(self.ratings.pop_front().flatten().and_then(Rating::new))
    }

    fn ask_correction(&mut self) -> anyhow::Result<Option<String>> {
        Ok(self.corrections.pop_front().flatten())
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

impl Frontend for ScriptedFrontend {
    fn show_reply(&mut self, text: &str) {
        self.replies.push(text.to_string());
    }
}

fn dataset_file(rows: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dataset.csv");
    std::fs::write(&path, format!("question,answer\n{}", rows)).unwrap();
    (dir, path)
}

fn session(path: &Path, generator: Arc<FixedGenerator>, speech: Arc<RecordingSpeech>, mode: Mode) -> SessionController {
    SessionController::new(
        DatasetStore::load(path).unwrap(),
        ResponseResolver::new(generator, GenerationParams::default()),
        FeedbackLoop::new(),
        speech,
        mode,
    )
}

#[tokio::test]
async fn learned_answer_is_reused_in_later_turns_and_sessions() {
    let (_dir, path) = dataset_file("");
    let generator = FixedGenerator::answering("Rust is a systems language.");
    let speech = Arc::new(RecordingSpeech::default());
    let mut bella = session(&path, generator.clone(), speech.clone(), Mode::Learning);
    let mut frontend = ScriptedFrontend::default().rating(9);

    let first = bella.handle_turn(Utterance::Typed("What is Rust".into()), &mut frontend).await;
    assert!(matches!(
        first,
        TurnOutcome::Answered {
            feedback: Some(FeedbackOutcome::Reinforced { append: AppendOutcome::Saved, .. }),
            ..
        }
    ));

    bella.set_mode(Mode::Talking);
    let second = bella.handle_turn(Utterance::Typed("so what is rust exactly".into()), &mut frontend).await;
    match second {
        TurnOutcome::Answered { turn, feedback } => {
            assert_eq!(turn.source, ResponseSource::Dataset);
            assert_eq!(turn.resolved_answer, "Rust is a systems language.");
            assert!(feedback.is_none());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(generator.calls(), 1);
    assert_eq!(speech.spoken().len(), 2);

    let reloaded = DatasetStore::load(&path).unwrap();
    assert_eq!(reloaded.lookup("what is rust"), Some("Rust is a systems language."));
}

#[tokio::test]
async fn low_rating_with_correction_saves_the_better_answer() {
    let (_dir, path) = dataset_file("");
    let speech = Arc::new(RecordingSpeech::default());
    let mut bella = session(&path, FixedGenerator::answering("meh"), speech, Mode::Learning);
    let mut frontend = ScriptedFrontend::default().rating(3).correction("better");

    let outcome = bella.handle_turn(Utterance::Typed("Favourite colour?".into()), &mut frontend).await;

    assert!(matches!(
        outcome,
        TurnOutcome::Answered { feedback: Some(FeedbackOutcome::Corrected { .. }), .. }
    ));
    let reloaded = DatasetStore::load(&path).unwrap();
    assert_eq!(reloaded.lookup("favourite colour?"), Some("better"));
}

#[tokio::test]
async fn neutral_rating_leaves_the_file_untouched() {
    let (_dir, path) = dataset_file("hello,Hi there!\n");
    let before = std::fs::read(&path).unwrap();
    let speech = Arc::new(RecordingSpeech::default());
    let mut bella = session(&path, FixedGenerator::answering("Something"), speech, Mode::Learning);
    let mut frontend = ScriptedFrontend::default().rating(6);

    let outcome = bella.handle_turn(Utterance::Typed("tell me a joke".into()), &mut frontend).await;

    assert!(matches!(
        outcome,
        TurnOutcome::Answered { feedback: Some(FeedbackOutcome::Neutral(_)), .. }
    ));
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(bella.dataset().len(), 1);
}

#[tokio::test]
async fn reinforcing_a_known_question_is_skipped_with_a_notice() {
    let (_dir, path) = dataset_file("hello,Hi there!\n");
    let before = std::fs::read(&path).unwrap();
    let speech = Arc::new(RecordingSpeech::default());
    let mut bella = session(&path, FixedGenerator::answering("unused"), speech, Mode::Learning);
    let mut frontend = ScriptedFrontend::default().rating(10);

    let outcome = bella.handle_turn(Utterance::Typed("Hello".into()), &mut frontend).await;

    assert!(matches!(
        outcome,
        TurnOutcome::Answered {
            feedback: Some(FeedbackOutcome::Reinforced { append: AppendOutcome::Skipped, .. }),
            ..
        }
    ));
    assert!(frontend
        .notices
        .contains(&"Question 'hello' already exists in the dataset. Skipping save.".to_string()));
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn farewell_ends_the_session_without_resolving() {
    for mode in [Mode::Talking, Mode::Learning] {
        let (_dir, path) = dataset_file("now,It is now\n");
        let generator = FixedGenerator::answering("unused");
        let speech = Arc::new(RecordingSpeech::default());
        let mut bella = session(&path, generator.clone(), speech.clone(), mode);
        let mut frontend = ScriptedFrontend::default();

        let outcome = bella.handle_turn(Utterance::Spoken("ok bye now".into()), &mut frontend).await;

        assert!(outcome.ends_session());
        assert_eq!(speech.spoken(), vec![FAREWELL_LINE.to_string()]);
        assert_eq!(frontend.replies, vec![FAREWELL_LINE.to_string()]);
        assert!(frontend.notices.is_empty());
        assert_eq!(generator.calls(), 0);
    }
}

#[tokio::test]
async fn permissive_keyword_match_is_preserved() {
    let (_dir, path) = dataset_file("cat food,Here is cat food info\n");
    let speech = Arc::new(RecordingSpeech::default());
    let generator = FixedGenerator::answering("unused");
    let mut bella = session(&path, generator.clone(), speech, Mode::Talking);
    let mut frontend = ScriptedFrontend::default();

    bella.handle_turn(Utterance::Typed("scatter foodstuff please".into()), &mut frontend).await;

    assert_eq!(frontend.replies, vec!["Here is cat food info"]);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn generator_failure_gives_an_empty_reply_and_no_speech() {
    let (_dir, path) = dataset_file("");
    let speech = Arc::new(RecordingSpeech::default());
    let mut bella = session(&path, FixedGenerator::failing(), speech.clone(), Mode::Talking);
    let mut frontend = ScriptedFrontend::default();

    let outcome = bella.handle_turn(Utterance::Typed("anything".into()), &mut frontend).await;

    match outcome {
        TurnOutcome::Answered { turn, .. } => {
            assert_eq!(turn.resolved_answer, "");
            assert_eq!(turn.source, ResponseSource::Generated);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(speech.spoken().is_empty());
}

#[test]
fn ratings_are_logged_when_a_store_is_attached() {
    let (_dir, path) = dataset_file("");
    let mut dataset = DatasetStore::load(&path).unwrap();
    let feedback = FeedbackLoop::with_ratings(RatingStore::in_memory().unwrap());
    let turn = ConversationTurn {
        user_input: "hi".to_string(),
        resolved_answer: "Hello!".to_string(),
        source: ResponseSource::Generated,
    };

    let mut neutral = ScriptedFrontend::default().rating(6);
    feedback.run(&mut dataset, &turn, &mut neutral);
    let mut cancelled = ScriptedFrontend::default();
    feedback.run(&mut dataset, &turn, &mut cancelled);

    let ratings = feedback.ratings().unwrap();
    assert_eq!(ratings.count().unwrap(), 1);
    let recent = ratings.recent(5).unwrap();
    assert_eq!(recent[0].question, "hi");
    assert_eq!(recent[0].review, 6);
}

/// Front-end and speech sink writing to one shared timeline
#[derive(Clone, Default)]
struct Timeline(Arc<Mutex<Vec<String>>>);

impl Timeline {
    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSink for Timeline {
    async fn speak(&self, text: &str) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(format!("spoke: {}", text));
        Ok(())
    }
}

impl FeedbackPrompt for Timeline {
    fn ask_rating(&mut self) -> anyhow::Result<Option<Rating>> {
        Ok(None)
    }

    fn ask_correction(&mut self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    fn notify(&mut self, _message: &str) {}
}

impl Frontend for Timeline {
    fn show_reply(&mut self, text: &str) {
        self.0.lock().unwrap().push(format!("shown: {}", text));
    }
}

#[tokio::test]
async fn fixed_lines_are_shown_before_they_are_spoken() {
    let (_dir, path) = dataset_file("");
    let mut timeline = Timeline::default();
    let mut bella = SessionController::new(
        DatasetStore::load(&path).unwrap(),
        ResponseResolver::new(FixedGenerator::answering("unused"), GenerationParams::default()),
        FeedbackLoop::new(),
        Arc::new(timeline.clone()),
        Mode::Talking,
    );

    bella.handle_turn(Utterance::Unrecognized, &mut timeline).await;
    bella.handle_turn(Utterance::Typed("goodbye".into()), &mut timeline).await;

    assert_eq!(
        timeline.events(),
        vec![
            format!("shown: {}", NOT_UNDERSTOOD_LINE),
            format!("spoke: {}", NOT_UNDERSTOOD_LINE),
            format!("shown: {}", FAREWELL_LINE),
            format!("spoke: {}", FAREWELL_LINE),
        ]
    );
}
