use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use gemini_chat_core::{ChatError, LlmTransport};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::backing::{ChatView, ConversationBackingState, UiError};
use crate::config::AppConfig;
use crate::roles::{self, RolePreset};
use crate::session::{Session, SessionStoreError, SessionStoreRef};

/// Application state shared with all routes
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    sessions: SessionStoreRef,
    transport: Arc<dyn LlmTransport>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        sessions: SessionStoreRef,
        transport: Arc<dyn LlmTransport>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            transport,
        }
    }

    /// Fetches a live session and extends its lifetime
    async fn session(&self, id: &str) -> Result<Session, ApiError> {
        let mut session = self.sessions.get_session(id).await?;
        session.touch(self.config.session_ttl());
        self.sessions.save_session(session.clone()).await?;
        Ok(session)
    }
}

/// Either free role text or the label of a predefined role
#[derive(Deserialize)]
pub struct RoleRequest {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    preset: Option<String>,
}

impl RoleRequest {
    fn resolve(self) -> Result<String, ApiError> {
        match (self.preset, self.role) {
            (Some(label), _) => roles::find(&label)
                .map(|preset| preset.role.to_string())
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown role preset: {}", label))),
            (None, Some(role)) => Ok(role),
            (None, None) => Err(ApiError::BadRequest(
                "Either role or preset is required".to_string(),
            )),
        }
    }
}

#[derive(Deserialize)]
pub struct TurnRequest {
    question: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    id: String,
    chat: ChatView,
}

#[derive(Serialize)]
pub struct SessionSummary {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    turns: usize,
}

#[derive(Serialize)]
pub struct TurnResponse {
    reply: String,
    chat: ChatView,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_json: Option<String>,
}

/// Error type for HTTP server
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    /// The model endpoint refused the request
    Rejected {
        status: u16,
        reason: String,
        request_json: String,
    },
    BadGateway(String),
    InternalError(anyhow::Error),
}

impl From<SessionStoreError> for ApiError {
    fn from(e: SessionStoreError) -> Self {
        match e {
            SessionStoreError::NotFound(_) => Self::NotFound(e.to_string()),
            SessionStoreError::StorageError(_) => Self::InternalError(e.into()),
        }
    }
}

impl From<UiError> for ApiError {
    fn from(e: UiError) -> Self {
        match e {
            UiError::EmptyQuestion => Self::BadRequest(e.to_string()),
            UiError::RoleLocked => Self::Conflict(e.to_string()),
            UiError::Chat(ChatError::RequestRejected {
                status,
                reason,
                request_snapshot,
            }) => Self::Rejected {
                status,
                reason,
                request_json: request_snapshot,
            },
            UiError::Chat(
                chat @ (ChatError::MalformedResponse(_) | ChatError::Transport(_)),
            ) => Self::BadGateway(UiError::Chat(chat).to_string()),
            UiError::Chat(chat) => Self::InternalError(chat.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let plain = |status: StatusCode, error: String| {
            let body = ErrorResponse {
                error,
                upstream_status: None,
                upstream_reason: None,
                request_json: None,
            };
            (status, Json(body)).into_response()
        };

        match self {
            Self::NotFound(msg) => plain(StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => plain(StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => plain(StatusCode::CONFLICT, msg),
            Self::Rejected {
                status,
                reason,
                request_json,
            } => {
                let body = ErrorResponse {
                    error: format!(
                        "Problem communicating with the LLM API: {} : {}",
                        status, reason
                    ),
                    upstream_status: Some(status),
                    upstream_reason: Some(reason),
                    request_json: Some(request_json),
                };
                (StatusCode::BAD_GATEWAY, Json(body)).into_response()
            }
            Self::BadGateway(msg) => plain(StatusCode::BAD_GATEWAY, msg),
            Self::InternalError(e) => {
                error!(error = %e, "Internal server error");
                plain(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal server error: {}", e),
                )
            }
        }
    }
}

/// Builds the router with all chat routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/roles", get(list_roles))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/role", put(set_role))
        .route("/sessions/:id/turns", post(submit_turn))
        .route("/sessions/:id/debug", post(toggle_debug))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server, along with the expired-session sweeper
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Starting HTTP server on {}", addr);

    let sweeper_store = state.sessions.clone();
    let interval = StdDuration::from_secs(state.config.cleanup_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = sweeper_store.cleanup_expired_sessions().await {
                warn!(error = %e, "Failed to clean up expired sessions");
            }
        }
    });

    axum::Server::bind(&addr)
        .serve(router(state).into_make_service())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start HTTP server: {}", e))
}

/// Health check handler
async fn health() -> impl IntoResponse {
    "gemini-chat is running"
}

async fn list_roles() -> Json<&'static [RolePreset]> {
    Json(roles::presets())
}

/// Starts a new chat
async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let chat = ConversationBackingState::new(
        state.transport.clone(),
        state.config.gemini.default_system_role(),
    );
    let chat_view = chat.view();

    let mut session = state
        .sessions
        .create_session(Uuid::new_v4().to_string(), chat)
        .await?;
    session.touch(state.config.session_ttl());
    state.sessions.save_session(session.clone()).await?;

    info!(session_id = %session.id, "New chat started");
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            id: session.id,
            chat: chat_view,
        }),
    ))
}

/// Lists live chats, oldest first
async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let mut summaries = Vec::new();
    for session in state.sessions.list_sessions().await? {
        let turns = session.chat.lock().await.view().turns;
        summaries.push(SessionSummary {
            id: session.id,
            created_at: session.created_at,
            updated_at: session.updated_at,
            expires_at: session.expires_at,
            turns,
        });
    }
    summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(Json(summaries))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.session(&id).await?;
    let chat = session.chat.lock().await.view();
    Ok(Json(SessionResponse { id, chat }))
}

/// Ends a chat; the client starts over with a new session
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.sessions.delete_session(&id).await?;
    info!(session_id = %id, "Chat discarded");
    Ok(StatusCode::NO_CONTENT)
}

async fn set_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RoleRequest>,
) -> Result<Json<ChatView>, ApiError> {
    let role = payload.resolve()?;
    let session = state.session(&id).await?;
    let mut chat = session.chat.lock().await;
    chat.set_system_role(role)?;
    Ok(Json(chat.view()))
}

/// Handler for question submissions
async fn submit_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let session = state.session(&id).await?;
    // Held across the model call: turns on one conversation run one at a time.
    let mut chat = session.chat.lock().await;
    let result = chat.submit(&payload.question).await?;
    Ok(Json(TurnResponse {
        reply: result.reply().to_string(),
        chat: chat.view(),
    }))
}

async fn toggle_debug(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatView>, ApiError> {
    let session = state.session(&id).await?;
    let mut chat = session.chat.lock().await;
    chat.toggle_debug();
    Ok(Json(chat.view()))
}
