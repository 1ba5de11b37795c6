use std::sync::Arc;

use gemini_chat_core::{ChatError, ConversationStateManager, LlmTransport, TurnResult};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Errors surfaced to the person using the chat page
#[derive(Error, Debug)]
pub enum UiError {
    #[error("Question text is empty")]
    EmptyQuestion,

    #[error("The system role can no longer be changed in this conversation")]
    RoleLocked,

    #[error("Problem communicating with the LLM API: {0}")]
    Chat(#[from] ChatError),
}

/// Everything the chat page shows for one conversation.
///
/// Owns the conversation's state manager. The transcript is append-only and
/// only grows on successful turns.
pub struct ConversationBackingState {
    manager: ConversationStateManager<dyn LlmTransport>,
    system_role: String,
    role_changeable: bool,
    question: Option<String>,
    reply: Option<String>,
    transcript: String,
    request_json: Option<String>,
    response_json: Option<String>,
    debug: bool,
}

/// Serializable snapshot for rendering
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatView {
    pub system_role: String,
    pub role_changeable: bool,
    pub question: Option<String>,
    pub reply: Option<String>,
    pub transcript: String,
    pub turns: usize,
    pub debug: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_json: Option<String>,
}

impl ConversationBackingState {
    pub fn new(transport: Arc<dyn LlmTransport>, system_role: impl Into<String>) -> Self {
        Self {
            manager: ConversationStateManager::new(transport),
            system_role: system_role.into(),
            role_changeable: true,
            question: None,
            reply: None,
            transcript: String::new(),
            request_json: None,
            response_json: None,
            debug: false,
        }
    }

    pub fn set_system_role(&mut self, role: impl Into<String>) -> Result<(), UiError> {
        if !self.role_changeable {
            return Err(UiError::RoleLocked);
        }
        self.system_role = role.into();
        Ok(())
    }

    pub fn role_changeable(&self) -> bool {
        self.role_changeable
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn toggle_debug(&mut self) -> bool {
        self.debug = !self.debug;
        self.debug
    }

    /// Sends one question. Nothing reaches the network for a blank question.
    pub async fn submit(&mut self, question: &str) -> Result<TurnResult, UiError> {
        if question.trim().is_empty() {
            return Err(UiError::EmptyQuestion);
        }

        self.manager.configure_system_role(self.system_role.clone());
        let result = match self.manager.send_turn(question).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Turn failed");
                return Err(e.into());
            }
        };

        // Question and reply change together.
        self.question = Some(question.to_string());
        self.reply = Some(result.reply().to_string());
        self.request_json = Some(result.request_json().to_string());
        self.response_json = Some(result.response_json().to_string());
        self.transcript.push_str(&format!(
            "== User:\n{}\n== Server:\n{}\n",
            question,
            result.reply()
        ));
        if self.role_changeable {
            info!("First turn completed, system role locked");
            self.role_changeable = false;
        }

        Ok(result)
    }

    pub fn view(&self) -> ChatView {
        ChatView {
            system_role: self.system_role.clone(),
            role_changeable: self.role_changeable,
            question: self.question.clone(),
            reply: self.reply.clone(),
            transcript: self.transcript.clone(),
            turns: self.manager.turn_count(),
            debug: self.debug,
            request_json: self.request_json.clone().filter(|_| self.debug),
            response_json: self.response_json.clone().filter(|_| self.debug),
        }
    }
}
