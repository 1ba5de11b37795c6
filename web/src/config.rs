use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Duration;
use gemini_chat_core::config::{get_default_config_file, GeminiConfig};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "gemini-chat";

const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Configuration for the chat web server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    /// Idle time after which a conversation is discarded
    pub session_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
    pub gemini: GeminiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            http_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            session_ttl_secs: 30 * 60,
            cleanup_interval_secs: 60,
            gemini: GeminiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file; a missing file yields the defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            gemini: GeminiConfig::default().merge(&config.gemini),
            ..config
        })
    }

    /// Loads `~/.config/gemini-chat/config.toml`
    pub fn load_from_default() -> Result<Self> {
        let path = get_default_config_file(APP_NAME)?;
        Self::load_from_file(&path)
    }

    pub fn session_ttl(&self) -> Duration {
        let secs = self.session_ttl_secs.min(MAX_SESSION_TTL_SECS);
        Duration::seconds(secs as i64)
    }
}
