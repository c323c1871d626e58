//! Configuration loader and validator for the content engine.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::image::replicate::{ReplicateSettings, DEFAULT_REPLICATE_MODEL, REPLICATE_API_BASE};
use crate::image::together::{TogetherSettings, DEFAULT_TOGETHER_MODEL, TOGETHER_API_BASE};
use crate::image::JobPoller;
use crate::llm::openrouter::OPENROUTER_API_BASE;
use crate::prompt::{PromptSettings, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TEXT_MODEL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub app: App,
    pub text: Text,
    pub replicate: Replicate,
    pub together: Together,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    #[serde(default)]
    pub database_url: Option<String>,
}

/// Text-generation backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Text {
    #[serde(default = "default_text_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_text_model")]
    pub model: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_text_timeout")]
    pub timeout_seconds: u64,
}

/// Predict-and-poll image backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Replicate {
    #[serde(default = "default_replicate_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_replicate_model")]
    pub default_model: String,
    /// Only sent for models hosted on a third-party account.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    /// Most concurrent jobs started for one request.
    #[serde(default = "default_max_images")]
    pub max_images: u32,
}

/// Synchronous batch image backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Together {
    #[serde(default = "default_together_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_together_model")]
    pub default_model: String,
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_max_images")]
    pub max_images: u32,
}

fn default_text_base() -> String {
    OPENROUTER_API_BASE.to_string()
}
fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}
fn default_max_output_tokens() -> u32 {
    DEFAULT_MAX_OUTPUT_TOKENS
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_text_timeout() -> u64 {
    60
}
fn default_replicate_base() -> String {
    REPLICATE_API_BASE.to_string()
}
fn default_replicate_model() -> String {
    DEFAULT_REPLICATE_MODEL.to_string()
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_max_poll_attempts() -> u32 {
    20
}
fn default_together_base() -> String {
    TOGETHER_API_BASE.to_string()
}
fn default_together_model() -> String {
    DEFAULT_TOGETHER_MODEL.to_string()
}
fn default_dimension() -> u32 {
    1024
}
fn default_steps() -> u32 {
    4
}
fn default_max_images() -> u32 {
    4
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Fill empty credentials from the conventional environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if self.text.api_key.trim().is_empty() {
            if let Some(v) = get("OPENROUTER_API_KEY") {
                self.text.api_key = v;
            }
        }
        if self.replicate.api_token.trim().is_empty() {
            if let Some(v) = get("REPLICATE_API_TOKEN") {
                self.replicate.api_token = v;
            }
        }
        let openai_missing = self
            .replicate
            .openai_api_key
            .as_deref()
            .map(|k| k.trim().is_empty())
            .unwrap_or(true);
        if openai_missing {
            if let Some(v) = get("OPENAI_API_KEY") {
                self.replicate.openai_api_key = Some(v);
            }
        }
        if self.together.api_key.trim().is_empty() {
            if let Some(v) = get("TOGETHER_API_KEY") {
                self.together.api_key = v;
            }
        }
        if let Some(url) = get("DATABASE_URL") {
            self.app.database_url = Some(url);
        }
    }

    pub fn database_url(&self) -> String {
        self.app
            .database_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "sqlite://{}/visual_engine.db",
                    self.app.data_dir.trim_end_matches('/')
                )
            })
    }

    pub fn prompt_settings(&self) -> PromptSettings {
        PromptSettings {
            model: self.text.model.clone(),
            max_output_tokens: self.text.max_output_tokens,
            temperature: self.text.temperature,
        }
    }

    pub fn text_timeout(&self) -> Duration {
        Duration::from_secs(self.text.timeout_seconds)
    }

    pub fn poller(&self) -> JobPoller {
        JobPoller::new(
            Duration::from_millis(self.replicate.poll_interval_ms),
            self.replicate.max_poll_attempts,
        )
    }

    pub fn replicate_settings(&self) -> ReplicateSettings {
        ReplicateSettings {
            api_base: self.replicate.api_base.clone(),
            api_token: self.replicate.api_token.clone(),
            default_model: self.replicate.default_model.clone(),
            openai_api_key: self.replicate.openai_api_key.clone(),
            max_images: self.replicate.max_images,
            ..Default::default()
        }
    }

    pub fn together_settings(&self) -> TogetherSettings {
        TogetherSettings {
            api_base: self.together.api_base.clone(),
            api_key: self.together.api_key.clone(),
            default_model: self.together.default_model.clone(),
            width: self.together.width,
            height: self.together.height,
            steps: self.together.steps,
            max_images: self.together.max_images,
            ..Default::default()
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance. Credentials may be empty here; they are
/// checked by each backend when it is actually used.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    if cfg.text.api_base.trim().is_empty() {
        return Err(ConfigError::Invalid("text.api_base must be non-empty"));
    }
    if cfg.text.model.trim().is_empty() {
        return Err(ConfigError::Invalid("text.model must be non-empty"));
    }
    if cfg.text.max_output_tokens == 0 {
        return Err(ConfigError::Invalid("text.max_output_tokens must be > 0"));
    }
    if !(0.0..=2.0).contains(&cfg.text.temperature) {
        return Err(ConfigError::Invalid("text.temperature must be within 0.0..=2.0"));
    }
    if cfg.text.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("text.timeout_seconds must be > 0"));
    }

    if cfg.replicate.api_base.trim().is_empty() {
        return Err(ConfigError::Invalid("replicate.api_base must be non-empty"));
    }
    if cfg.replicate.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("replicate.poll_interval_ms must be > 0"));
    }
    if cfg.replicate.max_poll_attempts == 0 {
        return Err(ConfigError::Invalid("replicate.max_poll_attempts must be > 0"));
    }
    if cfg.replicate.max_images == 0 {
        return Err(ConfigError::Invalid("replicate.max_images must be > 0"));
    }

    let t = &cfg.together;
    if t.api_base.trim().is_empty() {
        return Err(ConfigError::Invalid("together.api_base must be non-empty"));
    }
    if t.default_model.trim().is_empty() {
        return Err(ConfigError::Invalid("together.default_model must be non-empty"));
    }
    if t.width == 0 || t.height == 0 {
        return Err(ConfigError::Invalid("together.width and together.height must be > 0"));
    }
    if t.steps == 0 {
        return Err(ConfigError::Invalid("together.steps must be > 0"));
    }
    if t.max_images == 0 {
        return Err(ConfigError::Invalid("together.max_images must be > 0"));
    }

    Ok(())
}

/// Example configuration document.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

text:
  api_base: "https://openrouter.ai/api/v1"
  api_key: "YOUR_OPENROUTER_API_KEY"
  model: "deepseek/deepseek-chat-v3-0324:free"
  max_output_tokens: 400
  temperature: 0.2
  timeout_seconds: 60

replicate:
  api_base: "https://api.replicate.com/v1"
  api_token: "YOUR_REPLICATE_API_TOKEN"
  default_model: "sdxl"
  openai_api_key: ""
  poll_interval_ms: 2000
  max_poll_attempts: 20
  max_images: 4

together:
  api_base: "https://api.together.xyz/v1"
  api_key: "YOUR_TOGETHER_API_KEY"
  default_model: "black-forest-labs/FLUX.1-schnell-Free"
  width: 1024
  height: 1024
  steps: 4
  max_images: 4
"#
}
