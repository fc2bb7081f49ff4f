// ABOUTME: Application configuration with defaults and file loading
// Supports TOML configuration files and environment variables

use crate::chat::client::DEFAULT_API_BASE;
use crate::utils::error::{ChatError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_greeting")]
    pub greeting: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub pricing_path: Option<PathBuf>,
    /// Only ever read from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
    #[serde(skip)]
    pub debug: bool,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_models() -> Vec<String> {
    ["gpt-4o-mini", "gpt-4o", "gpt-3.5-turbo", "o1-mini", "o1-preview"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_greeting() -> Option<String> {
    Some("How can I help you?".to_string())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            default_model: default_model(),
            models: default_models(),
            max_tokens: default_max_tokens(),
            greeting: default_greeting(),
            system_prompt: None,
            pricing_path: None,
            api_key: None,
            config_path: None,
            debug: false,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "token-chat", "token-chat")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from the default location (missing file means defaults),
    /// then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load an explicit file; unlike `load`, a missing file is an error
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatError::Config(format!("{}: {}", path.display(), e)))?;
        let mut config: Self = toml::from_str(&contents)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }

        if let Ok(model) = std::env::var("TOKEN_CHAT_MODEL") {
            self.default_model = model;
        }

        if let Ok(base) = std::env::var("TOKEN_CHAT_API_BASE") {
            self.api_base = base;
        }

        if let Ok(max) = std::env::var("TOKEN_CHAT_MAX_TOKENS") {
            if let Some(parsed) = parse_max_tokens(&max) {
                self.max_tokens = parsed;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(ChatError::Config("at least one model must be selectable".to_string()));
        }
        if !self.models.contains(&self.default_model) {
            return Err(ChatError::Config(format!(
                "default model '{}' is not in the selectable models",
                self.default_model
            )));
        }
        if self.max_tokens == 0 {
            return Err(ChatError::Config("max_tokens must be greater than zero".to_string()));
        }
        Ok(())
    }
}

fn parse_max_tokens(raw: &str) -> Option<u32> {
    match raw.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "Ignoring invalid TOKEN_CHAT_MAX_TOKENS");
            None
        }
    }
}
