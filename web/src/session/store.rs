use std::fmt::{self, Debug};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::backing::ConversationBackingState;

/// Error type for session store operations
#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

/// One conversation's session.
///
/// Cloning shares the same conversation state; the async mutex serializes
/// turns on it while other sessions proceed independently.
#[derive(Clone)]
pub struct Session {
    /// Unique session identifier
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Last time the session was accessed
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub chat: Arc<Mutex<ConversationBackingState>>,
}

impl Session {
    pub fn new(id: String, chat: ConversationBackingState) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            expires_at: None,
            chat: Arc::new(Mutex::new(chat)),
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if now > expires_at)
    }

    /// Marks the session as used now and pushes its expiry `ttl` into the future
    pub fn touch(&mut self, ttl: Duration) {
        let now = Utc::now();
        self.updated_at = now;
        self.expires_at = Some(now + ttl);
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Trait defining the interface for session stores
#[async_trait]
pub trait SessionStore: Send + Sync + Debug {
    /// Register a new session around the given conversation state
    async fn create_session(
        &self,
        id: String,
        chat: ConversationBackingState,
    ) -> Result<Session, SessionStoreError>;

    /// Get a live session by ID
    async fn get_session(&self, id: &str) -> Result<Session, SessionStoreError>;

    /// Save changes to a session's metadata
    async fn save_session(&self, session: Session) -> Result<(), SessionStoreError>;

    async fn delete_session(&self, id: &str) -> Result<(), SessionStoreError>;

    /// Delete expired sessions, returning how many were removed
    async fn cleanup_expired_sessions(&self) -> Result<usize, SessionStoreError>;

    /// List all active (non-expired) sessions
    async fn list_sessions(&self) -> Result<Vec<Session>, SessionStoreError>;
}

/// Type alias for Arc-wrapped SessionStore trait objects
pub type SessionStoreRef = Arc<dyn SessionStore>;
