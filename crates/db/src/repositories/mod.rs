use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use leadline_core::domain::conversation::{ConversationId, ConversationMessage, ConversationState};

pub mod conversation;
pub mod memory;
pub mod message;

pub use conversation::SqlConversationRepository;
pub use memory::{InMemoryConversationRepository, InMemoryMessageRepository};
pub use message::SqlMessageRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total_conversations: u64,
    /// Conversations with a score above zero.
    pub total_leads: u64,
    pub high_quality_leads: u64,
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<ConversationState>, RepositoryError>;

    /// Inserts or replaces the state stored under `state.id`.
    async fn save(&self, state: ConversationState) -> Result<(), RepositoryError>;

    /// Returns whether a state was removed.
    async fn delete(&self, id: &ConversationId) -> Result<bool, RepositoryError>;

    /// Conversations scoring at least `min_score`, best first, most recent first among ties.
    async fn list_leads(&self, min_score: u8) -> Result<Vec<ConversationState>, RepositoryError>;

    async fn stats(&self, high_quality_threshold: u8) -> Result<ConversationStats, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn append(&self, message: ConversationMessage) -> Result<(), RepositoryError>;

    /// The latest `limit` messages of a conversation, oldest first.
    async fn recent(
        &self,
        id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ConversationMessage>, RepositoryError>;

    async fn delete_for(&self, id: &ConversationId) -> Result<u64, RepositoryError>;

    async fn count(&self) -> Result<u64, RepositoryError>;
}
