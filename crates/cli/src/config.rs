//! Configuration loading from worker.toml.

use std::path::Path;

use realtime::{ClientConfig, DEFAULT_MODEL, OPENAI_REALTIME_URL};
use runtime::WorkerConfig;
use runtime::tools::WTTR_URL;
use serde::Deserialize;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Agent, timeouts and concurrency.
    #[serde(flatten)]
    pub worker: WorkerConfig,

    /// Hosted model connection.
    #[serde(default)]
    pub model: ModelConfig,

    /// Built-in tools.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Hosted model configuration.
#[derive(Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider name (currently only "openai" supported).
    pub provider: String,

    pub model: String,

    /// Realtime WebSocket endpoint, without query.
    pub url: String,

    pub voice: Option<String>,

    /// Output modalities, e.g. `["text"]` or `["text", "audio"]`.
    pub modalities: Vec<String>,

    /// Model used to transcribe participant audio.
    pub transcription_model: Option<String>,

    /// Falls back to `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: DEFAULT_MODEL.to_string(),
            url: OPENAI_REALTIME_URL.to_string(),
            voice: None,
            modalities: vec!["text".to_string()],
            transcription_model: None,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("url", &self.url)
            .field("voice", &self.voice)
            .field("modalities", &self.modalities)
            .field("transcription_model", &self.transcription_model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub weather: WeatherConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub enabled: bool,
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: WTTR_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config");
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "config not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if config.model.provider != "openai" {
            return Err(ConfigError::UnsupportedProvider(config.model.provider));
        }
        Ok(config)
    }

    /// The model API key, from the file or the environment.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        self.api_key_or(std::env::var(API_KEY_VAR).ok())
    }

    fn api_key_or(&self, fallback: Option<String>) -> Result<String, ConfigError> {
        self.model
            .api_key
            .clone()
            .or(fallback)
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Realtime client settings. The handshake shares the session connect
    /// timeout.
    pub fn client_config(&self, api_key: String) -> ClientConfig {
        ClientConfig::new(api_key)
            .with_url(&self.model.url)
            .with_model(&self.model.model)
            .with_handshake_timeout(self.worker.timeouts.session_connect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("unsupported model provider '{0}'")]
    UnsupportedProvider(String),

    #[error("model API key not configured: set model.api_key or OPENAI_API_KEY")]
    MissingApiKey,
}
