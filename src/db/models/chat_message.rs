//! Persisted chat messages. Immutable once created; the realtime path
//! only ever inserts, history endpoints only ever read.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::{now_rfc3339, DbPool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub created_at: String,
}

impl ChatMessage {
    pub fn new(room_id: &str, sender_id: &str, sender_name: &str, content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: sender_name.to_string(),
            content: content.to_string(),
            created_at: now_rfc3339(),
        }
    }

    pub async fn insert(&self, pool: &DbPool) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO chat_messages (id, room_id, sender_id, sender_name, content, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.room_id)
        .bind(&self.sender_id)
        .bind(&self.sender_name)
        .bind(&self.content)
        .bind(&self.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Room history, oldest first.
    pub async fn list_for_room(pool: &DbPool, room_id: &str) -> sqlx::Result<Vec<ChatMessage>> {
        sqlx::query_as("SELECT * FROM chat_messages WHERE room_id = ? ORDER BY created_at ASC, id ASC")
            .bind(room_id)
            .fetch_all(pool)
            .await
    }
}
