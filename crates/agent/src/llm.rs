use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use leadline_core::domain::conversation::{ConversationMessage, ConversationState, MessageRole};

use crate::prompt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl From<MessageRole> for ChatRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Self::User,
            MessageRole::Assistant => Self::Assistant,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self { temperature: 0.8, max_tokens: 300, presence_penalty: 0.6, frequency_penalty: 0.3 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub sampling: SamplingParams,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

#[async_trait]
impl<C> LlmClient for Arc<C>
where
    C: LlmClient + ?Sized,
{
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        (**self).complete(request).await
    }
}

/// Produces the next outbound message for a conversation.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        state: &ConversationState,
        text: &str,
        history: &[ConversationMessage],
    ) -> Result<String>;
}

pub struct LlmResponseGenerator<C> {
    client: C,
    sampling: SamplingParams,
}

impl<C> LlmResponseGenerator<C>
where
    C: LlmClient,
{
    pub fn new(client: C, sampling: SamplingParams) -> Self {
        Self { client, sampling }
    }

    pub fn build_request(
        &self,
        state: &ConversationState,
        text: &str,
        history: &[ConversationMessage],
    ) -> ChatRequest {
        let mut messages = vec![
            ChatMessage::new(ChatRole::System, prompt::SYSTEM_PROMPT),
            ChatMessage::new(ChatRole::System, prompt::build_context_message(state)),
        ];
        messages.extend(
            history.iter().map(|message| ChatMessage::new(message.role.into(), &message.content)),
        );

        let already_in_history = history
            .last()
            .is_some_and(|last| last.role == MessageRole::User && last.content == text);
        if !already_in_history {
            messages.push(ChatMessage::new(ChatRole::User, text));
        }

        ChatRequest { messages, sampling: self.sampling }
    }
}

#[async_trait]
impl<C> ResponseGenerator for LlmResponseGenerator<C>
where
    C: LlmClient,
{
    async fn generate(
        &self,
        state: &ConversationState,
        text: &str,
        history: &[ConversationMessage],
    ) -> Result<String> {
        let request = self.build_request(state, text, history);
        self.client.complete(&request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::Utc;

    use leadline_core::domain::conversation::{
        ConversationId, ConversationMessage, ConversationState, MessageRole,
    };

    use super::{
        ChatRequest, ChatRole, LlmClient, LlmResponseGenerator, ResponseGenerator, SamplingParams,
    };

    #[derive(Default)]
    struct RecordingClient {
        requests: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl LlmClient for RecordingClient {
        async fn complete(&self, request: &ChatRequest) -> Result<String> {
            self.requests.lock().expect("requests lock").push(request.clone());
            Ok("Lovely, which area do you prefer?".to_string())
        }
    }

    fn history_message(role: MessageRole, content: &str) -> ConversationMessage {
        ConversationMessage {
            conversation_id: ConversationId("c-1".to_string()),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn request_carries_prompt_context_and_history() {
        let generator =
            LlmResponseGenerator::new(RecordingClient::default(), SamplingParams::default());
        let state = ConversationState::new(ConversationId("c-1".to_string()), Utc::now());
        let history = vec![
            history_message(MessageRole::User, "hi"),
            history_message(MessageRole::Assistant, "Hello! How can I help?"),
            history_message(MessageRole::User, "looking for a villa"),
        ];

        let reply =
            generator.generate(&state, "looking for a villa", &history).await.expect("reply");
        assert_eq!(reply, "Lovely, which area do you prefer?");

        let requests = generator.client.requests.lock().expect("requests lock");
        let request = &requests[0];
        let roles: Vec<ChatRole> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                ChatRole::System,
                ChatRole::System,
                ChatRole::User,
                ChatRole::Assistant,
                ChatRole::User
            ]
        );
        assert_eq!(request.sampling.max_tokens, 300);
    }

    #[test]
    fn current_text_is_appended_when_missing_from_history() {
        let generator =
            LlmResponseGenerator::new(RecordingClient::default(), SamplingParams::default());
        let state = ConversationState::new(ConversationId("c-1".to_string()), Utc::now());

        let request = generator.build_request(&state, "hello", &[]);

        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[2].role, ChatRole::User);
        assert_eq!(request.messages[2].content, "hello");
    }
}
