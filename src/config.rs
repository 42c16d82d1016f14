//! Configuration management
//!
//! Manages dataset location, the generative-text endpoint, voice services,
//! the speaking avatar and the optional ratings log.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "bella-chat";
const APPLICATION: &str = "bella";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Question/answer dataset
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// Generative-text fallback
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Speech input and output
    #[serde(default)]
    pub voice: VoiceConfig,
    /// Terminal avatar shown while speaking
    #[serde(default)]
    pub avatar: AvatarConfig,
    /// Ratings log
    #[serde(default)]
    pub ratings: RatingsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// CSV file with a `question,answer` header
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
}

fn default_dataset_path() -> PathBuf {
    data_dir()
        .map(|d| d.join("dataset.csv"))
        .unwrap_or_else(|_| PathBuf::from("dataset.csv"))
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self { path: default_dataset_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Hugging Face compatible inference base URL
    #[serde(default = "default_generator_url")]
    pub base_url: String,
    /// Text-generation model id
    #[serde(default = "default_generator_model")]
    pub model: String,
    /// Maximum length of the generated text
    #[serde(default = "default_max_length")]
    pub max_length: u32,
    /// Number of candidates requested (only the first is used)
    #[serde(default = "default_num_return_sequences")]
    pub num_return_sequences: u32,
    /// Request timeout in seconds
    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
}

fn default_generator_url() -> String {
    "https://api-inference.huggingface.co".to_string()
}

fn default_generator_model() -> String {
    "distilgpt2".to_string()
}

fn default_max_length() -> u32 {
    30
}

fn default_num_return_sequences() -> u32 {
    1
}

fn default_generator_timeout() -> u64 {
    30
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_generator_url(),
            model: default_generator_model(),
            max_length: default_max_length(),
            num_return_sequences: default_num_return_sequences(),
            timeout_secs: default_generator_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Speak replies aloud
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Kokoro-compatible TTS server
    #[serde(default = "default_tts_url")]
    pub tts_url: String,
    /// TTS voice name
    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,
    /// faster-whisper model size
    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,
    /// faster-whisper wrapper script (reads base64 WAV on stdin, prints JSON)
    #[serde(default = "default_whisper_script")]
    pub whisper_script: PathBuf,
    /// Python interpreter used to run the script
    #[serde(default = "default_python")]
    pub python: PathBuf,
    /// Seconds of microphone audio captured per `/speak`
    #[serde(default = "default_record_seconds")]
    pub record_seconds: f64,
}

fn default_true() -> bool {
    true
}

fn default_tts_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_tts_voice() -> String {
    "af_heart".to_string()
}

fn default_whisper_model() -> String {
    "base".to_string()
}

fn default_whisper_script() -> PathBuf {
    data_dir()
        .map(|d| d.join("faster-whisper-server.py"))
        .unwrap_or_else(|_| PathBuf::from("faster-whisper-server.py"))
}

fn default_python() -> PathBuf {
    PathBuf::from("python3")
}

fn default_record_seconds() -> f64 {
    5.0
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tts_url: default_tts_url(),
            tts_voice: default_tts_voice(),
            whisper_model: default_whisper_model(),
            whisper_script: default_whisper_script(),
            python: default_python(),
            record_seconds: default_record_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    /// Shown when Bella is not speaking
    #[serde(default = "default_idle_frame")]
    pub idle_frame: String,
    /// Cycled while audio plays
    #[serde(default = "default_speaking_frames")]
    pub speaking_frames: Vec<String>,
    /// Milliseconds per speaking frame
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,
}

fn default_idle_frame() -> String {
    "(^_^)".to_string()
}

fn default_speaking_frames() -> Vec<String> {
    ["(^o^)", "(^O^)", "(^o^)", "(^-^)"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_frame_interval() -> u64 {
    120
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            idle_frame: default_idle_frame(),
            speaking_frames: default_speaking_frames(),
            frame_interval_ms: default_frame_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingsConfig {
    /// SQLite database holding the `reviews` table
    #[serde(default = "default_ratings_path")]
    pub db_path: PathBuf,
    /// Record every rating given in learning mode
    #[serde(default)]
    pub persist: bool,
}

fn default_ratings_path() -> PathBuf {
    data_dir()
        .map(|d| d.join("reviews.db"))
        .unwrap_or_else(|_| PathBuf::from("reviews.db"))
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            db_path: default_ratings_path(),
            persist: false,
        }
    }
}

impl Config {
    /// Load configuration from file, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = config_path()?;

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&contents).context("Failed to parse config file")?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env();
        config.sanitize();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = config_path()?;
        let parent = config_path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Replace values that would break at runtime with their defaults
    pub(crate) fn sanitize(&mut self) {
        let seconds = self.voice.record_seconds;
        if !seconds.is_finite() || seconds <= 0.0 {
            warn!(record_seconds = seconds, "Invalid voice.record_seconds, using default");
            self.voice.record_seconds = default_record_seconds();
        }
    }

    /// Environment overrides, applied after the file
    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("BELLA_DATASET") {
            self.dataset.path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("BELLA_TTS_URL") {
            self.voice.tts_url = url;
        }
        if let Ok(url) = std::env::var("BELLA_GENERATOR_URL") {
            self.generator.base_url = url;
        }
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .context("Failed to get project directories")?;
    Ok(base.data_dir().to_path_buf())
}

/// Show current configuration
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration ({})", config_path()?.display());
    println!();
    println!("  dataset:     {}", config.dataset.path.display());
    println!("  generator:   {} @ {}", config.generator.model, config.generator.base_url);
    println!("               max_length={}, sequences={}",
        config.generator.max_length, config.generator.num_return_sequences);
    println!("  voice:       {}", if config.voice.enabled { "enabled" } else { "disabled" });
    println!("  tts:         {} (voice {})", config.voice.tts_url, config.voice.tts_voice);
    println!("  stt:         faster-whisper {} via {}",
        config.voice.whisper_model, config.voice.whisper_script.display());
    println!("  ratings db:  {} ({})", config.ratings.db_path.display(),
        if config.ratings.persist { "recording" } else { "not recording" });
    println!("  HF API key:  {}",
        if crate::security::has_hf_api_key() { "configured" } else { "not configured" });

    Ok(())
}

/// Reset configuration to defaults
pub fn reset_config() -> Result<()> {
    let config = Config::default();
    config.save()?;
    println!("Configuration reset to defaults.");
    Ok(())
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}
