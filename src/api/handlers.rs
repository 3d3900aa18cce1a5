use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{ConversationStats, EngineMessage};
use crate::error::{AppError, AppResult};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Omit to start a new session
    pub session_id: Option<Uuid>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub message: EngineMessage,
    pub suggested_follow_ups: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub stats: ConversationStats,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Process one chat message, creating the session on first contact
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    if request.message.trim().is_empty() {
        return Err(AppError::InvalidInput("Message must not be empty".to_string()));
    }

    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);

    // Only this session's lock is held across the catalog fetches; the
    // sessions map itself is released before the turn starts
    let conversation = state.conversation(session_id).await;
    let response = conversation.lock().await.process_message(&request.message).await;

    tracing::info!(
        session_id = %session_id,
        items = response.message.items.len(),
        "Chat turn complete"
    );

    Ok(Json(ChatResponse {
        session_id,
        message: response.message,
        suggested_follow_ups: response.suggested_follow_ups,
    }))
}

/// Clear a session's history, keeping the session itself alive
pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    match state.existing_conversation(id).await {
        Some(conversation) => {
            conversation.lock().await.reset();
            Ok(StatusCode::OK)
        }
        None => Err(AppError::NotFound(format!("Unknown session: {}", id))),
    }
}

/// Session history summary
pub async fn session_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StatsResponse>> {
    match state.existing_conversation(id).await {
        Some(conversation) => Ok(Json(StatsResponse {
            session_id: id,
            stats: conversation.lock().await.stats(),
        })),
        None => Err(AppError::NotFound(format!("Unknown session: {}", id))),
    }
}
