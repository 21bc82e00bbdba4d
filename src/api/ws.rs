//! Realtime chat over WebSocket.
//!
//! Protocol: the client sends JSON text events tagged with `type`
//! (`join-chat-room`, `send-chat-message`); the server fans
//! `new-chat-message` frames out to every live member of the room.
//! Room membership lasts only as long as the connection; a
//! reconnecting client must rejoin. Messages are persisted on a
//! detached task, so delivery never waits on (or fails with) storage.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::chat::ConnectionId;
use crate::db::ChatMessage;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinChatRoom { room_id: String },
    #[serde(rename_all = "camelCase")]
    SendChatMessage {
        room_id: String,
        sender_id: String,
        sender_name: String,
        content: String,
    },
}

/// WebSocket endpoint for realtime chat
/// GET /ws/chat
pub async fn chat_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_chat_socket(socket, state))
}

async fn handle_chat_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let conn_id = Uuid::new_v4();

    // Frames addressed to this connection; the channel preserves the
    // order broadcasts were made in.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    loop {
        tokio::select! {
            Some(frame) = rx.recv() => {
                if sender.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_event(&state, conn_id, &tx, &text);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    state.chat.disconnect(conn_id);
}

fn handle_client_event(
    state: &Arc<AppState>,
    conn_id: ConnectionId,
    tx: &mpsc::UnboundedSender<String>,
    text: &str,
) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(ClientEvent::JoinChatRoom { room_id }) => {
            tracing::debug!(%conn_id, room_id, "Connection joined chat room");
            state.chat.join(conn_id, &room_id, tx.clone());
        }
        Ok(ClientEvent::SendChatMessage {
            room_id,
            sender_id,
            sender_name,
            content,
        }) => {
            let message = ChatMessage::new(&room_id, &sender_id, &sender_name, &content);
            let frame = serde_json::json!({
                "type": "new-chat-message",
                "id": message.id,
                "roomId": message.room_id,
                "senderId": message.sender_id,
                "senderName": message.sender_name,
                "content": message.content,
                "createdAt": message.created_at,
            })
            .to_string();
            state.chat.broadcast(&room_id, &frame);

            let pool = state.db.clone();
            tokio::spawn(async move {
                if let Err(e) = message.insert(&pool).await {
                    tracing::error!(room_id = %message.room_id, "Error saving chat message: {e}");
                }
            });
        }
        Err(e) => {
            tracing::warn!("Failed to parse chat event: {e}");
        }
    }
}
