//! CLI interface for bella

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{execute, style::{Color, Print, ResetColor, SetForegroundColor}};
use rustyline::error::ReadlineError;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::agent::{GenerationParams, HuggingFaceGenerator, ResponseResolver};
use crate::config::Config;
use crate::dataset::{AppendOutcome, DatasetStore};
use crate::learning::{FeedbackLoop, FeedbackPrompt, RatingStore};
use crate::session::{Frontend, SessionController, SpeechSink};
use crate::types::{Mode, Rating, Utterance};
use crate::voice::{AvatarAnimation, SilentOutput, SpeechInput};

#[derive(Parser)]
#[command(name = "bella")]
#[command(about = "Bella - a dataset-first chat companion that learns from your ratings", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session (default when no command given)
    Chat {
        /// Start in learning mode (rate every reply)
        #[arg(short, long)]
        learning: bool,
        /// Text only: no speech output or input
        #[arg(long)]
        no_voice: bool,
        /// Dataset CSV to use instead of the configured one
        #[arg(short, long)]
        dataset: Option<PathBuf>,
    },
    /// Resolve a single question and print the reply
    Ask {
        /// The question
        text: String,
        /// Dataset CSV to use instead of the configured one
        #[arg(short, long)]
        dataset: Option<PathBuf>,
    },
    /// Manage the question/answer dataset
    Dataset {
        /// Dataset CSV to use instead of the configured one
        #[arg(short, long, global = true)]
        dataset: Option<PathBuf>,
        #[command(subcommand)]
        command: DatasetCommands,
    },
    /// Show stored ratings
    Ratings {
        /// Number of recent ratings to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Configure bella
    Config {
        /// Set Hugging Face API key (generative fallback)
        #[arg(long)]
        set_hf_api_key: Option<String>,
        /// Remove the stored Hugging Face API key
        #[arg(long)]
        delete_hf_api_key: bool,
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
    /// Create the ratings database
    InitDb,
}

#[derive(Subcommand)]
enum DatasetCommands {
    /// Create an empty dataset (header only) if none exists
    Init,
    /// List every question and answer
    List,
    /// Add a question/answer pair
    Add {
        question: String,
        answer: String,
    },
    /// Look up the stored answer for a question
    Lookup {
        question: String,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => run_chat(false, false, None).await?,
        Some(Commands::Chat { learning, no_voice, dataset }) => {
            run_chat(learning, no_voice, dataset).await?;
        }
        Some(Commands::Ask { text, dataset }) => {
            ask(&text, dataset).await?;
        }
        Some(Commands::Dataset { dataset, command }) => {
            let config = Config::load()?;
            let path = dataset.unwrap_or(config.dataset.path);
            match command {
                DatasetCommands::Init => {
                    let store = DatasetStore::open_or_create(&path)?;
                    println!("Dataset ready at {} ({} entries)", path.display(), store.len());
                }
                DatasetCommands::List => {
                    let store = DatasetStore::load(&path)?;
                    if store.is_empty() {
                        println!("Dataset is empty.");
                    }
                    for entry in store.entries() {
                        println!("{} => {}", entry.question, entry.answer);
                    }
                }
                DatasetCommands::Add { question, answer } => {
                    let mut store = DatasetStore::load(&path)?;
                    match store.append(&question, &answer)? {
                        AppendOutcome::Saved => println!("Saved '{}'.", question.to_lowercase()),
                        AppendOutcome::Skipped => println!(
                            "Question '{}' already exists in the dataset. Skipping save.",
                            question.to_lowercase()
                        ),
                    }
                }
                DatasetCommands::Lookup { question } => {
                    let store = DatasetStore::load(&path)?;
                    match store.lookup(&question) {
                        Some(answer) => println!("{}", answer),
                        None => println!("No entry for '{}'.", question),
                    }
                }
            }
        }
        Some(Commands::Ratings { limit }) => {
            show_ratings(limit)?;
        }
        Some(Commands::Config { set_hf_api_key, delete_hf_api_key, show, reset }) => {
            if let Some(key) = set_hf_api_key {
                crate::security::set_hf_api_key(&key)?;
                println!("Hugging Face API key saved.");
            } else if delete_hf_api_key {
                crate::security::delete_hf_api_key()?;
                println!("Hugging Face API key removed.");
            } else if reset {
                crate::config::reset_config()?;
            } else if show {
                crate::config::show_config()?;
            } else {
                println!("Configuration options:");
                println!("  --set-hf-api-key <key>   Set your Hugging Face API key");
                println!("  --delete-hf-api-key      Remove the stored API key");
                println!("  --show                   Display current configuration");
                println!("  --reset                  Reset configuration to defaults");
                println!();
                println!("Default configuration:");
                println!("{}", crate::config::default_config_toml());
            }
        }
        Some(Commands::InitDb) => {
            let config = Config::load()?;
            RatingStore::open(&config.ratings.db_path)?;
            println!("Ratings database ready at {}", config.ratings.db_path.display());
        }
    }

    Ok(())
}

fn build_resolver(config: &Config) -> Result<ResponseResolver> {
    let generator = HuggingFaceGenerator::from_config(&config.generator)
        .context("Failed to set up the text generator")?;
    Ok(ResponseResolver::new(Arc::new(generator), GenerationParams::from(&config.generator)))
}

fn speech_sink(config: &Config, voice: bool) -> Arc<dyn SpeechSink> {
    #[cfg(feature = "voice")]
    {
        if voice {
            return Arc::new(crate::voice::VoiceOutput::from_config(config));
        }
    }
    #[cfg(not(feature = "voice"))]
    {
        if voice {
            tracing::warn!(tts = %config.voice.tts_url, "Built without the `voice` feature, replies are text only");
        }
    }
    Arc::new(SilentOutput)
}

async fn ask(text: &str, dataset: Option<PathBuf>) -> Result<()> {
    let config = Config::load()?;
    let path = dataset.unwrap_or_else(|| config.dataset.path.clone());
    let store = DatasetStore::load(&path)?;
    let resolver = build_resolver(&config)?;

    let reply = resolver.resolve(&store, text).await;
    print_colored("Bella: ", Color::Magenta);
    println!("{}", reply.text);
    print_dim(&format!("  ({})\n", reply.source));
    Ok(())
}

fn show_ratings(limit: usize) -> Result<()> {
    let config = Config::load()?;
    let store = RatingStore::open(&config.ratings.db_path)?;

    println!("Ratings ({})", config.ratings.db_path.display());
    println!("  total:   {}", store.count()?);
    match store.average()? {
        Some(avg) => println!("  average: {:.1}", avg),
        None => println!("  average: -"),
    }
    if !config.ratings.persist {
        print_dim("  recording is off (set ratings.persist = true)\n");
    }
    println!();
    for record in store.recent(limit)? {
        println!("  [{:>2}] {} => {}", record.review, record.question, record.answer);
    }
    Ok(())
}

/// Interactive chat loop
async fn run_chat(learning: bool, no_voice: bool, dataset: Option<PathBuf>) -> Result<()> {
    let config = Config::load()?;
    let path = dataset.unwrap_or_else(|| config.dataset.path.clone());

    let store = DatasetStore::load(&path)
        .with_context(|| format!("Cannot start without a dataset (try `bella dataset init --dataset {}`)", path.display()))?;

    let ratings = RatingStore::open(&config.ratings.db_path)?;
    let feedback = if config.ratings.persist {
        FeedbackLoop::with_ratings(ratings)
    } else {
        FeedbackLoop::new()
    };

    let voice = config.voice.enabled && !no_voice;
    let resolver = build_resolver(&config)?;
    let speech = speech_sink(&config, voice);
    let avatar = AvatarAnimation::from_config(&config.avatar);
    let mut controller = SessionController::new(store, resolver, feedback, speech, Mode::from_learning(learning));

    let listener = voice.then(|| SpeechInput::from_config(&config.voice));

    let mut terminal = Terminal::new()?;
    print_banner(&controller, voice);
    info!(dataset = %path.display(), mode = %controller.mode(), voice, "Chat session started");

    loop {
        let prompt = format!("{} \x1b[32m❯\x1b[0m ", avatar.idle_frame());
        let line = match terminal.editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                print_error(&format!("Error: {}\n", err));
                break;
            }
        };

        let utterance = match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => {
                print_help();
                continue;
            }
            "/learn" => {
                controller.toggle_mode(&mut terminal);
                continue;
            }
            "/speak" => match listener.as_ref() {
                Some(listener) => {
                    print_dim(&format!("Listening for {:.0}s...\n", config.voice.record_seconds));
                    let heard = listener.listen().await;
                    if let Some(text) = heard.text() {
                        print_colored("You: ", Color::Green);
                        println!("{}", text);
                    }
                    heard
                }
                None => {
                    print_error("Voice is disabled for this session.\n");
                    continue;
                }
            },
            _ => {
                let _ = terminal.editor.add_history_entry(line.as_str());
                Utterance::Typed(line)
            }
        };

        if controller.handle_turn(utterance, &mut terminal).await.ends_session() {
            break;
        }
    }

    info!(entries = controller.dataset().len(), "Chat session ended");
    Ok(())
}

/// rustyline-backed terminal front-end
struct Terminal {
    editor: rustyline::DefaultEditor,
}

impl Terminal {
    fn new() -> Result<Self> {
        let editor = rustyline::DefaultEditor::new().context("Failed to initialise line editor")?;
        Ok(Self { editor })
    }

    /// Read one modal answer; `None` on blank input, Ctrl-C or Ctrl-D
    fn read_answer(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) if line.trim().is_empty() => Ok(None),
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl FeedbackPrompt for Terminal {
    fn ask_rating(&mut self) -> Result<Option<Rating>> {
        prompt_rating(
            || self.read_answer("  rating (Enter to skip) ❯ "),
            || print_error(&format!(
                "  Please enter a whole number from {} to {}.\n",
                Rating::MIN,
                Rating::MAX
            )),
        )
    }

    fn ask_correction(&mut self) -> Result<Option<String>> {
        print_info("What would be a better response?\n");
        self.read_answer("  better answer ❯ ")
    }

    fn notify(&mut self, message: &str) {
        print_info(&format!("{}\n", message));
    }
}

/// Parse a typed rating; `None` unless it is a whole number in range
fn parse_rating(input: &str) -> Option<Rating> {
    input.trim().parse::<u8>().ok().and_then(Rating::new)
}

/// Ask until a valid rating arrives. `read` returning `None` cancels.
fn prompt_rating(
    mut read: impl FnMut() -> Result<Option<String>>,
    mut on_invalid: impl FnMut(),
) -> Result<Option<Rating>> {
    while let Some(answer) = read()? {
        match parse_rating(&answer) {
            Some(rating) => return Ok(Some(rating)),
            None => on_invalid(),
        }
    }
    Ok(None)
}

impl Frontend for Terminal {
    fn show_reply(&mut self, text: &str) {
        print_colored("Bella: ", Color::Magenta);
        println!("{}", text);
    }
}

fn print_banner(controller: &SessionController, voice: bool) {
    print_colored("\nBella ", Color::Magenta);
    print_dim(&format!("{}\n", crate::info()));
    print_dim(&format!(
        "{} entries | {} | voice {}\n",
        controller.dataset().len(),
        controller.mode(),
        if voice { "on" } else { "off" }
    ));
    print_dim("Type /help for commands. Say goodbye to leave.\n\n");
}

fn print_help() {
    print_info("Commands:\n");
    println!("  /learn   Toggle learning mode (rate each reply)");
    println!("  /speak   Say something instead of typing");
    println!("  /help    Show this help");
    println!("  /quit    Leave without saying goodbye");
}

/// Print colored output
fn print_colored(text: &str, color: Color) {
    let _ = execute!(
        io::stdout(),
        SetForegroundColor(color),
        Print(text),
        ResetColor
    );
}

fn print_dim(text: &str) {
    print_colored(text, Color::DarkGrey);
}

fn print_info(text: &str) {
    print_colored(text, Color::Cyan);
}

fn print_error(text: &str) {
    print_colored(text, Color::Red);
}
