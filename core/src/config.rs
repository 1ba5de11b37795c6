use crate::errors::{ChatError, ChatResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable the API key is read from
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const FALLBACK_SYSTEM_ROLE: &str = "You are a helpful assistant.";

/// Configuration struct for the Gemini API
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub base_url: Option<String>,
    /// Role used when a conversation starts without one being chosen
    pub system_prompt: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: Some(DEFAULT_MODEL.to_string()),
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            system_prompt: Some(FALLBACK_SYSTEM_ROLE.to_string()),
        }
    }
}

impl GeminiConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> ChatResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ChatError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ChatError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            system_prompt: other
                .system_prompt
                .clone()
                .or_else(|| self.system_prompt.clone()),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn default_system_role(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(FALLBACK_SYSTEM_ROLE)
    }

    /// The configured key wins; otherwise the key comes from `source`.
    pub fn resolve_api_key(&self, source: &dyn ApiKeySource) -> ChatResult<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.clone());
        }
        source.api_key().ok_or_else(|| {
            ChatError::Config(format!(
                "API key is required: set api_key in the config file or {}",
                API_KEY_ENV_VAR
            ))
        })
    }
}

/// Provides the API key at startup
pub trait ApiKeySource: Send + Sync {
    fn api_key(&self) -> Option<String>;
}

/// Reads the key from the process environment, loading a `.env` file first if one exists
#[derive(Debug, Clone)]
pub struct EnvKeySource {
    var: String,
}

impl EnvKeySource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvKeySource {
    fn default() -> Self {
        Self::new(API_KEY_ENV_VAR)
    }
}

impl ApiKeySource for EnvKeySource {
    fn api_key(&self) -> Option<String> {
        // A missing .env file is the normal case.
        let _ = dotenvy::dotenv();
        std::env::var(&self.var)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// A key known up front, e.g. passed on the command line
#[derive(Debug, Clone)]
pub struct StaticKeySource(pub Option<String>);

impl ApiKeySource for StaticKeySource {
    fn api_key(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> ChatResult<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| ChatError::Config("Could not determine home directory".to_string()))?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> ChatResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
