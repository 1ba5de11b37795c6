use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::config::{ApiKeySource, GeminiConfig};
use crate::errors::{ChatError, ChatResult};

/// Status line and body of one API response, fully read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Sends a serialized request document to the model endpoint
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn send(&self, body: String) -> ChatResult<RawResponse>;
}

/// Client for the Gemini generateContent endpoint
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a new client. The key is resolved once, here.
    pub fn new(config: &GeminiConfig, key_source: &dyn ApiKeySource) -> ChatResult<Self> {
        let api_key = config.resolve_api_key(key_source)?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url().trim_end_matches('/'),
            config.model_name()
        );

        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key,
        })
    }

    /// Endpoint URL without the key
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmTransport for GeminiClient {
    async fn send(&self, body: String) -> ChatResult<RawResponse> {
        debug!(endpoint = %self.endpoint, bytes = body.len(), "Sending generateContent request");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            // The error's URL would carry the key.
            .map_err(|e| ChatError::Transport(format!("Failed to send request: {}", e.without_url())))?;

        let status = response.status();
        // Reading the body to the end hands the connection back to the pool.
        let body = response.text().await.map_err(|e| {
            ChatError::Transport(format!("Failed to read response body: {}", e.without_url()))
        })?;

        debug!(status = status.as_u16(), bytes = body.len(), "Received response");

        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}
