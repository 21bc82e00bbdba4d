//! Chat history endpoints. Live delivery happens over the websocket
//! (`api::ws`); these routes only read and append the persisted log.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::ChatMessage;
use crate::AppState;

use super::error::ApiError;
use super::middleware::CurrentUser;

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub success: bool,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct MessageCreatedResponse {
    pub success: bool,
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

/// GET /api/chat/:room_id — room history, oldest first.
pub async fn get_room_messages(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let messages = ChatMessage::list_for_room(&state.db, &room_id).await?;
    Ok(Json(MessageListResponse {
        success: true,
        messages,
    }))
}

/// POST /api/chat/:room_id — append a message to the log. The sender
/// is denormalized from the authenticated identity at send time.
pub async fn post_room_message(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(room_id): Path<String>,
    Json(request): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessageCreatedResponse>), ApiError> {
    if request.content.trim().is_empty() {
        return Err(ApiError::bad_request("Message content is required"));
    }

    let message = ChatMessage::new(
        &room_id,
        &current.user.id,
        &current.user.name,
        &request.content,
    );
    message.insert(&state.db).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageCreatedResponse {
            success: true,
            message,
        }),
    ))
}
