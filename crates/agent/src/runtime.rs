use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use leadline_core::domain::conversation::{
    ConversationId, ConversationMessage, ConversationState, MessageRole,
};
use leadline_core::errors::{ApplicationError, DomainError};
use leadline_core::scoring::HIGH_QUALITY_THRESHOLD;
use leadline_db::{ConversationRepository, MessageRepository, RepositoryError};

use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::llm::ResponseGenerator;
use crate::qualifier::{InboundOutcome, LeadQualifier};

pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentReply {
    pub text: String,
    /// Reason code when the fallback message was sent instead of a generated reply.
    pub degraded: Option<&'static str>,
    /// Present whenever qualification succeeded, even if the reply itself degraded.
    pub state: Option<ConversationState>,
}

/// A conversation's state together with its recent message history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationSnapshot {
    pub state: ConversationState,
    pub messages: Vec<ConversationMessage>,
}

pub struct AgentRuntime {
    qualifier: LeadQualifier,
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    responder: Arc<dyn ResponseGenerator>,
    guardrails: GuardrailPolicy,
    history_limit: u32,
}

impl AgentRuntime {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        messages: Arc<dyn MessageRepository>,
        responder: Arc<dyn ResponseGenerator>,
    ) -> Self {
        Self {
            qualifier: LeadQualifier::new(Arc::clone(&conversations)),
            conversations,
            messages,
            responder,
            guardrails: GuardrailPolicy::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_guardrails(mut self, guardrails: GuardrailPolicy) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn with_history_limit(mut self, history_limit: u32) -> Self {
        self.history_limit = history_limit.max(1);
        self
    }

    pub fn qualifier(&self) -> &LeadQualifier {
        &self.qualifier
    }

    /// Qualifies an inbound message and produces the reply to send back.
    ///
    /// Only domain errors (such as a missing conversation id) surface to the caller. Storage
    /// and model failures are logged and answered with the fallback message so the lead always
    /// hears back.
    pub async fn handle_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<AgentReply, DomainError> {
        let inbound = match self.qualifier.process_inbound_message(conversation_id, text).await {
            Ok(inbound) => inbound,
            Err(ApplicationError::Domain(error)) => return Err(error),
            Err(error) => {
                warn!(
                    event_name = "agent.qualification_failed",
                    conversation_id,
                    error = %error,
                    "answering with fallback"
                );
                return Ok(self.fallback("qualification_failed", None));
            }
        };

        if inbound.previous_score < HIGH_QUALITY_THRESHOLD
            && inbound.score() >= HIGH_QUALITY_THRESHOLD
        {
            info!(
                event_name = "lead.high_quality",
                conversation_id = %inbound.state.id,
                score = inbound.score(),
                stage = %inbound.stage(),
                "lead crossed the high quality threshold"
            );
        }

        match self.respond(&inbound, text).await {
            Ok(reply) => Ok(reply),
            Err(error) => {
                warn!(
                    event_name = "agent.reply_failed",
                    conversation_id = %inbound.state.id,
                    error = %error,
                    "answering with fallback"
                );
                Ok(self.fallback("reply_failed", Some(inbound.state)))
            }
        }
    }

    pub async fn conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationSnapshot>, ApplicationError> {
        let Some(state) = self.qualifier.get_state(conversation_id).await? else {
            return Ok(None);
        };
        let messages =
            self.messages.recent(&state.id, self.history_limit).await.map_err(persistence)?;
        Ok(Some(ConversationSnapshot { state, messages }))
    }

    /// Removes the state and history of a conversation. Returns whether a state existed.
    pub async fn delete_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<bool, ApplicationError> {
        let id = ConversationId::parse(conversation_id)?;
        let removed_messages = self.messages.delete_for(&id).await.map_err(persistence)?;
        let removed_state = self.conversations.delete(&id).await.map_err(persistence)?;

        info!(
            event_name = "lead.conversation_deleted",
            conversation_id = %id,
            removed_state,
            removed_messages,
            "conversation deleted"
        );
        Ok(removed_state)
    }

    async fn respond(
        &self,
        inbound: &InboundOutcome,
        text: &str,
    ) -> Result<AgentReply, ApplicationError> {
        let id = &inbound.state.id;
        self.messages.append(message(id, MessageRole::User, text)).await.map_err(persistence)?;

        let history = self.messages.recent(id, self.history_limit).await.map_err(persistence)?;
        let raw = self
            .responder
            .generate(&inbound.state, text, &history)
            .await
            .map_err(|error| ApplicationError::Integration(format!("{error:#}")))?;

        match self.guardrails.evaluate(&raw) {
            GuardrailDecision::Allow { text: reply } => {
                self.messages
                    .append(message(id, MessageRole::Assistant, &reply))
                    .await
                    .map_err(persistence)?;
                Ok(AgentReply { text: reply, degraded: None, state: Some(inbound.state.clone()) })
            }
            GuardrailDecision::Degrade { reason_code, user_message, fallback_path } => {
                warn!(
                    event_name = "agent.reply_degraded",
                    conversation_id = %id,
                    reason_code,
                    fallback_path,
                    "generated reply rejected"
                );
                Ok(AgentReply {
                    text: user_message,
                    degraded: Some(reason_code),
                    state: Some(inbound.state.clone()),
                })
            }
        }
    }

    fn fallback(&self, reason_code: &'static str, state: Option<ConversationState>) -> AgentReply {
        AgentReply {
            text: self.guardrails.fallback(reason_code).text().to_string(),
            degraded: Some(reason_code),
            state,
        }
    }
}

fn message(id: &ConversationId, role: MessageRole, content: &str) -> ConversationMessage {
    ConversationMessage {
        conversation_id: id.clone(),
        role,
        content: content.to_string(),
        created_at: Utc::now(),
    }
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}
