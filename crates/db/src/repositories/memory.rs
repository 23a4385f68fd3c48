use std::collections::HashMap;

use tokio::sync::RwLock;

use leadline_core::domain::conversation::{ConversationId, ConversationMessage, ConversationState};

use super::{ConversationRepository, ConversationStats, MessageRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryConversationRepository {
    states: RwLock<HashMap<ConversationId, ConversationState>>,
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<ConversationState>, RepositoryError> {
        let states = self.states.read().await;
        Ok(states.get(id).cloned())
    }

    async fn save(&self, state: ConversationState) -> Result<(), RepositoryError> {
        let mut states = self.states.write().await;
        states.insert(state.id.clone(), state);
        Ok(())
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, RepositoryError> {
        let mut states = self.states.write().await;
        Ok(states.remove(id).is_some())
    }

    async fn list_leads(&self, min_score: u8) -> Result<Vec<ConversationState>, RepositoryError> {
        let states = self.states.read().await;
        let mut leads: Vec<ConversationState> =
            states.values().filter(|state| state.score >= min_score).cloned().collect();
        leads.sort_by(|a, b| {
            b.score.cmp(&a.score).then_with(|| b.last_activity.cmp(&a.last_activity))
        });
        Ok(leads)
    }

    async fn stats(
        &self,
        high_quality_threshold: u8,
    ) -> Result<ConversationStats, RepositoryError> {
        let states = self.states.read().await;
        let scores: Vec<u8> = states.values().map(|state| state.score).collect();

        Ok(ConversationStats {
            total_conversations: scores.len() as u64,
            total_leads: scores.iter().filter(|score| **score > 0).count() as u64,
            high_quality_leads: scores
                .iter()
                .filter(|score| **score >= high_quality_threshold)
                .count() as u64,
        })
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<HashMap<ConversationId, Vec<ConversationMessage>>>,
}

#[async_trait::async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, message: ConversationMessage) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        messages.entry(message.conversation_id.clone()).or_default().push(message);
        Ok(())
    }

    async fn recent(
        &self,
        id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ConversationMessage>, RepositoryError> {
        let messages = self.messages.read().await;
        let history = messages.get(id).map(Vec::as_slice).unwrap_or_default();
        let skip = history.len().saturating_sub(limit as usize);
        Ok(history[skip..].to_vec())
    }

    async fn delete_for(&self, id: &ConversationId) -> Result<u64, RepositoryError> {
        let mut messages = self.messages.write().await;
        Ok(messages.remove(id).map(|history| history.len() as u64).unwrap_or(0))
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages.values().map(|history| history.len() as u64).sum())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use leadline_core::domain::conversation::{
        ConversationId, ConversationMessage, ConversationState, MessageRole,
    };

    use crate::repositories::{
        ConversationRepository, InMemoryConversationRepository, InMemoryMessageRepository,
        MessageRepository,
    };

    #[tokio::test]
    async fn in_memory_conversation_repo_round_trip() {
        let repo = InMemoryConversationRepository::default();
        let mut state = ConversationState::new(ConversationId("c-1".to_string()), Utc::now());
        state.lead.name = Some("Omar Haddad".to_string());
        state.score = 10;

        repo.save(state.clone()).await.expect("save state");
        let found = repo.find_by_id(&state.id).await.expect("find state");

        assert_eq!(found, Some(state.clone()));
        assert_eq!(repo.list_leads(1).await.expect("leads"), vec![state.clone()]);
        assert!(repo.delete(&state.id).await.expect("delete"));
        assert_eq!(repo.stats(70).await.expect("stats").total_conversations, 0);
    }

    #[tokio::test]
    async fn in_memory_message_repo_keeps_tail_in_order() {
        let repo = InMemoryMessageRepository::default();
        let id = ConversationId("c-1".to_string());
        for content in ["one", "two", "three"] {
            repo.append(ConversationMessage {
                conversation_id: id.clone(),
                role: MessageRole::User,
                content: content.to_string(),
                created_at: Utc::now(),
            })
            .await
            .expect("append");
        }

        let recent = repo.recent(&id, 2).await.expect("recent");
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three"]);
        assert!(repo.recent(&ConversationId("none".to_string()), 5).await.expect("empty").is_empty());
        assert_eq!(repo.delete_for(&id).await.expect("delete"), 3);
        assert_eq!(repo.count().await.expect("count"), 0);
    }
}
