use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::backing::ConversationBackingState;
use crate::session::store::{Session, SessionStore, SessionStoreError};

/// In-memory implementation of SessionStore. Sessions live for the process lifetime at most.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    /// Thread-safe storage of sessions
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(
        &self,
        id: String,
        chat: ConversationBackingState,
    ) -> Result<Session, SessionStoreError> {
        let session = Session::new(id.clone(), chat);

        let mut sessions = self.sessions.write().map_err(|e| {
            SessionStoreError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;

        if sessions.contains_key(&id) {
            return Err(SessionStoreError::StorageError(format!(
                "Session already exists: {}",
                id
            )));
        }

        sessions.insert(id, session.clone());
        debug!(session_id = %session.id, "Created session");

        Ok(session)
    }

    async fn get_session(&self, id: &str) -> Result<Session, SessionStoreError> {
        let sessions = self.sessions.read().map_err(|e| {
            SessionStoreError::StorageError(format!("Failed to acquire read lock: {}", e))
        })?;

        let session = sessions
            .get(id)
            .cloned()
            .ok_or_else(|| SessionStoreError::NotFound(id.to_string()))?;

        if session.is_expired() {
            return Err(SessionStoreError::NotFound(format!("Session expired: {}", id)));
        }

        Ok(session)
    }

    async fn save_session(&self, session: Session) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(|e| {
            SessionStoreError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;

        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(|e| {
            SessionStoreError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;

        if sessions.remove(id).is_none() {
            return Err(SessionStoreError::NotFound(id.to_string()));
        }

        debug!(session_id = %id, "Deleted session");
        Ok(())
    }

    async fn cleanup_expired_sessions(&self) -> Result<usize, SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(|e| {
            SessionStoreError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;

        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        let count = before - sessions.len();

        if count > 0 {
            info!(count, "Cleaned up expired sessions");
        }

        Ok(count)
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, SessionStoreError> {
        let sessions = self.sessions.read().map_err(|e| {
            SessionStoreError::StorageError(format!("Failed to acquire read lock: {}", e))
        })?;

        let now = Utc::now();
        let active_sessions: Vec<Session> = sessions
            .values()
            .filter(|session| !session.is_expired_at(now))
            .cloned()
            .collect();

        debug!(count = active_sessions.len(), "Listed active sessions");
        Ok(active_sessions)
    }
}
