//! # chatrs Session API Routes
//!
//! File: cli/src/commands/serve/routes.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! JSON handlers for the session API. Each session sits behind its own async
//! mutex inside a shared map; the map lock is held only long enough to find,
//! insert or remove an entry.
//!
//! ## Endpoints
//!
//! | Method | Path                               | Result                           |
//! |--------|------------------------------------|----------------------------------|
//! | POST   | `/api/sessions`                    | 201 `{"id"}`                     |
//! | GET    | `/api/sessions/{id}`               | 200 `{"id","state","turns"}`     |
//! | POST   | `/api/sessions/{id}/messages`      | 200 `{"reply","source"}` or 204  |
//! | DELETE | `/api/sessions/{id}/transcript`    | 204                              |
//! | DELETE | `/api/sessions/{id}`               | 204                              |
//! | POST   | `/api/feedback`                    | 204                              |
//! | GET    | `/health`                          | 200 `ok`                         |
//!
//! Unknown sessions give 404. A session already waiting on the model gives
//! 409 instead of queueing the second message. Sessions idle for longer than
//! the configured TTL are dropped when the next session is created; past the
//! session cap, creation answers 503.
//!
use crate::chat::feedback::FeedbackClient;
use crate::chat::session::{Session, SessionFactory, SessionState};
use crate::chat::transcript::Turn;
use crate::core::error::ChatrsError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Idle time after which a session may be dropped.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(3600);
/// Live sessions allowed at once.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_used: std::sync::Mutex<Instant>,
}

impl SessionEntry {
    fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_used
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .elapsed()
    }
}

type SessionMap = HashMap<Uuid, SessionEntry>;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    factory: Arc<SessionFactory>,
    sessions: Arc<RwLock<SessionMap>>,
    feedback: Option<FeedbackClient>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl AppState {
    pub fn new(factory: SessionFactory, feedback: Option<FeedbackClient>) -> Self {
        Self {
            factory: Arc::new(factory),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            feedback,
            idle_ttl: DEFAULT_SESSION_IDLE,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Overrides the idle TTL and the session cap.
    pub fn with_limits(mut self, idle_ttl: Duration, max_sessions: usize) -> Self {
        self.idle_ttl = idle_ttl;
        self.max_sessions = max_sessions;
        self
    }

    async fn session(&self, id: Uuid) -> Result<Arc<Mutex<Session>>, ApiError> {
        let sessions = self.sessions.read().await;
        let entry = sessions
            .get(&id)
            .ok_or_else(|| ApiError::from(ChatrsError::SessionNotFound { id: id.to_string() }))?;
        entry.touch();
        Ok(entry.session.clone())
    }
}

/// Drops idle sessions. A session whose lock is held is in use, whatever
/// its timestamp says.
fn evict_idle(sessions: &mut SessionMap, idle_ttl: Duration) {
    let before = sessions.len();
    sessions.retain(|_, entry| {
        entry.idle_for() < idle_ttl || entry.session.try_lock().is_err()
    });
    let evicted = before - sessions.len();
    if evicted > 0 {
        debug!("Evicted {} idle session(s)", evicted);
    }
}

/// Locks a session without waiting; a held lock means a reply is in flight.
fn try_lock(
    id: Uuid,
    session: &Arc<Mutex<Session>>,
) -> Result<tokio::sync::MutexGuard<'_, Session>, ApiError> {
    session
        .try_lock()
        .map_err(|_| ChatrsError::SessionBusy { id: id.to_string() }.into())
}

/// Error response: a status plus `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<ChatrsError> for ApiError {
    fn from(err: ChatrsError) -> Self {
        let status = match &err {
            ChatrsError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            ChatrsError::SessionBusy { .. } => StatusCode::CONFLICT,
            ChatrsError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            ChatrsError::Feedback(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ChatrsError>() {
            Ok(known) => known.into(),
            Err(other) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("{:#}", other),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!("{}: {}", self.status, self.message);
        }
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct CreatedSession {
    id: Uuid,
}

#[derive(Debug, Serialize)]
struct SessionView<'a> {
    id: Uuid,
    state: SessionState,
    turns: &'a [Turn],
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    text: String,
}

#[derive(Debug, Serialize)]
struct ReplyBody {
    reply: String,
    source: &'static str,
}

/// Builds the API router (without middleware).
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(show_session).delete(end_session))
        .route("/api/sessions/{id}/messages", post(post_message))
        .route("/api/sessions/{id}/transcript", delete(clear_transcript))
        .route("/api/feedback", post(post_feedback))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn create_session(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut sessions = state.sessions.write().await;
    evict_idle(&mut sessions, state.idle_ttl);
    if sessions.len() >= state.max_sessions {
        return Err(ApiError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: format!("session limit of {} reached", state.max_sessions),
        });
    }
    let session = state.factory.create();
    let id = session.id();
    sessions.insert(
        id,
        SessionEntry {
            session: Arc::new(Mutex::new(session)),
            last_used: std::sync::Mutex::new(Instant::now()),
        },
    );
    Ok((StatusCode::CREATED, Json(CreatedSession { id })).into_response())
}

async fn show_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let session = state.session(id).await?;
    let guard = try_lock(id, &session)?;
    let view = SessionView {
        id,
        state: guard.state(),
        turns: guard.transcript().turns(),
    };
    Ok(Json(view).into_response())
}

async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TextBody>,
) -> Result<Response, ApiError> {
    let session = state.session(id).await?;
    let mut guard = try_lock(id, &session)?;
    match guard.handle(&body.text).await {
        Some(reply) => Ok(Json(ReplyBody {
            reply: reply.text,
            source: reply.source.label(),
        })
        .into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn clear_transcript(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let session = state.session(id).await?;
    try_lock(id, &session)?.clear();
    Ok(StatusCode::NO_CONTENT)
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match state.sessions.write().await.remove(&id) {
        Some(_) => {
            info!("Session {} ended", id);
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ChatrsError::SessionNotFound { id: id.to_string() }.into()),
    }
}

async fn post_feedback(
    State(state): State<AppState>,
    Json(body): Json<TextBody>,
) -> Result<StatusCode, ApiError> {
    if body.text.trim().is_empty() {
        return Err(ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "feedback text is empty".to_string(),
        });
    }
    let client = state.feedback.as_ref().ok_or_else(|| {
        ApiError::from(ChatrsError::Config(
            "feedback.url is not set".to_string(),
        ))
    })?;
    client.submit(&body.text).await?;
    Ok(StatusCode::NO_CONTENT)
}
