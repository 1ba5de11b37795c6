use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gemini_chat_core::{EnvKeySource, GeminiClient, API_KEY_ENV_VAR};
use gemini_chat_web::config::AppConfig;
use gemini_chat_web::http_server::{self, AppState};
use gemini_chat_web::session::InMemorySessionStore;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "gemini-chat-web", about = "Multi-turn Gemini chat server")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gemini API key (defaults to the GEMINI_API_KEY environment variable)
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Gemini model to use
    #[arg(short = 'm', long)]
    model: Option<String>,

    /// Base URL of the Gemini API
    #[arg(long)]
    base_url: Option<String>,

    /// Default system role for new chats
    #[arg(short, long)]
    system_prompt: Option<String>,

    /// HTTP server address
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Seconds of inactivity before a chat is discarded
    #[arg(long)]
    session_ttl: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GEMINI_CHAT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .init();

    info!("Starting gemini-chat web server");

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("Configuration error in {}", path.display()))?,
        None => AppConfig::load_from_default().context("Configuration error")?,
    };

    if let Some(api_key) = args.api_key {
        config.gemini.api_key = Some(api_key);
    }
    if let Some(model) = args.model {
        config.gemini.model_name = Some(model);
    }
    if let Some(base_url) = args.base_url {
        config.gemini.base_url = Some(base_url);
    }
    if let Some(system_prompt) = args.system_prompt {
        config.gemini.system_prompt = Some(system_prompt);
    }
    if let Some(http_addr) = args.http_addr {
        config.http_addr = http_addr;
    }
    if let Some(ttl) = args.session_ttl {
        config.session_ttl_secs = ttl;
    }

    let client = match GeminiClient::new(&config.gemini, &EnvKeySource::default()) {
        Ok(client) => {
            info!(endpoint = %client.endpoint(), "Initialized Gemini client");
            client
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Gemini client (is {} set?)", API_KEY_ENV_VAR);
            return Err(anyhow::anyhow!("Failed to initialize Gemini client: {}", e));
        }
    };

    let addr = config.http_addr;
    let state = AppState::new(config, Arc::new(InMemorySessionStore::new()), Arc::new(client));

    if let Err(e) = http_server::run_server(state, addr).await {
        error!(error = %e, "HTTP server failed");
        return Err(e);
    }

    info!("gemini-chat web server shutting down");
    Ok(())
}
