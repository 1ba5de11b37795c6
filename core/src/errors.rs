use thiserror::Error;

use crate::types::Role;

/// Errors produced while carrying a conversation with the Gemini API
#[derive(Error, Debug)]
pub enum ChatError {
    /// The endpoint answered with a non-success status. Carries a pretty-printed
    /// copy of the request body that was attempted.
    #[error("Request rejected: {status} : {reason}")]
    RequestRejected {
        status: u16,
        reason: String,
        request_snapshot: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Turn order violated: expected a {expected} turn, found {found}")]
    TurnOrder { expected: Role, found: Role },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Transport Error: {0}")]
    Transport(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl ChatError {
    /// HTTP status carried by a rejected request, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for conversation operations
pub type ChatResult<T> = Result<T, ChatError>;
