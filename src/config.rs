use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Environment override for the API base URL
pub const API_URL_ENV: &str = "SYMPTOM_ASSISTANT_API_URL";

/// Environment override for the chat model
pub const MODEL_ENV: &str = "SYMPTOM_ASSISTANT_MODEL";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: u32,

    /// OpenAI-compatible API root; `/v1/...` paths are appended
    pub api_base_url: String,
    pub chat_model: String,
    pub transcription_model: String,
    pub language: String,
    pub request_timeout_secs: u64,
    /// Attempts per remote call; 1 disables automatic retries
    pub max_attempts: u32,

    // Voice input
    pub record_seconds: u32,
    pub input_device_id: Option<String>,

    pub speech: SpeechConfig,

    /// Loaded from the environment only, never written to disk
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: 1,
            api_base_url: "https://api.groq.com/openai".to_string(),
            chat_model: "llama3-8b-8192".to_string(),
            transcription_model: "whisper-large-v3-turbo".to_string(),
            language: "en".to_string(),
            request_timeout_secs: 60,
            max_attempts: 1,
            record_seconds: 5,
            input_device_id: None,
            speech: SpeechConfig::default(),
            api_key: None,
        }
    }
}

impl Config {
    /// Load config from file, or create default
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file {:?}", path))
        } else {
            debug!("No config file at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save config to file, creating the parent directory if needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".symptom-assistant"))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.json"))
    }

    /// Load from `path` (or the default location) and apply environment overrides
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };
        let mut config = Self::load(&path)?;
        config.apply_env();
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup; blank values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = get(API_KEY_ENV) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = get(API_URL_ENV) {
            debug!("API URL overridden from {}", API_URL_ENV);
            self.api_base_url = url;
        }
        if let Some(model) = get(MODEL_ENV) {
            debug!("Chat model overridden from {}", MODEL_ENV);
            self.chat_model = model;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn record_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.record_seconds.max(1)))
    }
}

/// Text-to-speech programs.
///
/// Argument templates may contain `{text}` (the text to speak) and `{file}`
/// (the generated audio file path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub synth_program: String,
    pub synth_args: Vec<String>,
    pub player_program: String,
    pub player_args: Vec<String>,
    /// Extension of the generated audio file
    pub file_extension: String,
    /// Directory for generated audio; the system temp dir when unset
    pub output_dir: Option<PathBuf>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                synth_program: "say".to_string(),
                synth_args: vec!["-o".into(), "{file}".into(), "--".into(), "{text}".into()],
                player_program: "afplay".to_string(),
                player_args: vec!["{file}".into()],
                file_extension: "aiff".to_string(),
                output_dir: None,
            }
        } else {
            Self {
                synth_program: "espeak".to_string(),
                synth_args: vec!["-w".into(), "{file}".into(), "--".into(), "{text}".into()],
                player_program: "aplay".to_string(),
                player_args: vec!["-q".into(), "{file}".into()],
                file_extension: "wav".to_string(),
                output_dir: None,
            }
        }
    }
}
