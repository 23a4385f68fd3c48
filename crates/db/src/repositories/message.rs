use chrono::{DateTime, Utc};
use sqlx::Row;

use leadline_core::domain::conversation::{ConversationId, ConversationMessage, MessageRole};

use super::{MessageRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMessageRepository {
    pool: DbPool,
}

impl SqlMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationMessage, RepositoryError> {
    let conversation_id: String =
        row.try_get("conversation_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role: String = row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let content: String =
        row.try_get("content").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let role = MessageRole::parse(&role)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown message role `{role}`")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ConversationMessage {
        conversation_id: ConversationId(conversation_id),
        role,
        content,
        created_at,
    })
}

#[async_trait::async_trait]
impl MessageRepository for SqlMessageRepository {
    async fn append(&self, message: ConversationMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversation_message (conversation_id, role, content, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&message.conversation_id.0)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(
        &self,
        id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ConversationMessage>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT conversation_id, role, content, created_at FROM (
                 SELECT id, conversation_id, role, content, created_at
                 FROM conversation_message
                 WHERE conversation_id = ?
                 ORDER BY id DESC
                 LIMIT ?
             ) ORDER BY id ASC",
        )
        .bind(&id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect::<Result<Vec<_>, _>>()
    }

    async fn delete_for(&self, id: &ConversationId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM conversation_message WHERE conversation_id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM conversation_message")
            .fetch_one(&self.pool)
            .await?
            .try_get("total")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        u64::try_from(total).map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}
