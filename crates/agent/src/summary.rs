use std::sync::Arc;

use anyhow::{bail, Result};

use leadline_core::domain::conversation::ConversationMessage;

use crate::llm::{ChatMessage, ChatRequest, ChatRole, LlmClient, SamplingParams};

/// Transcript window sent to the model when summarising a conversation.
pub const SUMMARY_HISTORY_LIMIT: u32 = 50;

pub const SUMMARY_SAMPLING: SamplingParams = SamplingParams {
    temperature: 0.3,
    max_tokens: 200,
    presence_penalty: 0.0,
    frequency_penalty: 0.0,
};

const SUMMARY_INSTRUCTIONS: &str = "\
Summarize this WhatsApp conversation between a real estate consultant and a lead. \
Focus on the key requirements, budget, timeline, objections and next steps. \
Reply with a concise summary of three to four sentences in plain text.";

/// Writes a short hand-over note for an agent picking up a conversation.
pub struct ConversationSummarizer {
    client: Arc<dyn LlmClient>,
    sampling: SamplingParams,
}

impl ConversationSummarizer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client, sampling: SUMMARY_SAMPLING }
    }

    pub fn build_request(&self, transcript: &[ConversationMessage]) -> ChatRequest {
        let lines: Vec<String> = transcript
            .iter()
            .map(|message| format!("{}: {}", message.role.as_str(), message.content))
            .collect();
        let prompt = format!("{SUMMARY_INSTRUCTIONS}\n\nConversation:\n{}", lines.join("\n"));

        ChatRequest {
            messages: vec![ChatMessage::new(ChatRole::User, prompt)],
            sampling: self.sampling,
        }
    }

    pub async fn summarize(&self, transcript: &[ConversationMessage]) -> Result<String> {
        if transcript.is_empty() {
            bail!("conversation has no messages to summarize");
        }

        let summary = self.client.complete(&self.build_request(transcript)).await?;
        let summary = summary.trim();
        if summary.is_empty() {
            bail!("model returned an empty summary");
        }
        Ok(summary.to_string())
    }
}
