use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use leadline_agent::{ChatMessage, ChatRequest, LlmClient};
use leadline_core::config::LlmConfig;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::warn;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Chat-completions client for OpenAI and OpenAI-compatible servers such as Ollama.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    completions_url: String,
    model: String,
    api_key: Option<SecretString>,
    max_retries: u32,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let http =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self {
            http,
            completions_url: format!("{}/chat/completions", config.endpoint()),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    fn body<'a>(&'a self, request: &'a ChatRequest) -> CompletionBody<'a> {
        CompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.sampling.temperature,
            max_tokens: request.sampling.max_tokens,
            presence_penalty: request.sampling.presence_penalty,
            frequency_penalty: request.sampling.frequency_penalty,
        }
    }

    async fn send(&self, body: &CompletionBody<'_>) -> Result<String, Attempt> {
        let mut builder = self.http.post(&self.completions_url).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|error| Attempt::Retry(error.into()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let error = anyhow!("chat completion returned {status}: {detail}");
            let attempt =
                if is_retryable(status) { Attempt::Retry(error) } else { Attempt::Fail(error) };
            return Err(attempt);
        }

        let payload: CompletionResponse = response
            .json()
            .await
            .context("chat completion response was not valid JSON")
            .map_err(Attempt::Fail)?;
        first_choice(payload).map_err(Attempt::Fail)
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = self.body(request);
        let mut attempt = 0;

        loop {
            match self.send(&body).await {
                Ok(text) => return Ok(text),
                Err(Attempt::Fail(error)) => return Err(error),
                Err(Attempt::Retry(error)) if attempt >= self.max_retries => return Err(error),
                Err(Attempt::Retry(error)) => {
                    let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);
                    warn!(
                        event_name = "llm.completion.retry",
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying chat completion"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

enum Attempt {
    Retry(anyhow::Error),
    Fail(anyhow::Error),
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn first_choice(payload: CompletionResponse) -> Result<String> {
    let Some(choice) = payload.choices.into_iter().next() else {
        bail!("chat completion returned no choices");
    };
    Ok(choice.message.content.unwrap_or_default().trim().to_string())
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    presence_penalty: f32,
    frequency_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use leadline_agent::{ChatMessage, ChatRequest, ChatRole, SamplingParams};
    use leadline_core::config::{AppConfig, LlmProvider};
    use reqwest::StatusCode;
    use secrecy::SecretString;

    use super::{first_choice, is_retryable, CompletionResponse, OpenAiCompatibleClient};

    fn client(provider: LlmProvider) -> OpenAiCompatibleClient {
        let mut config = AppConfig::default().llm;
        config.provider = provider;
        config.base_url = None;
        config.api_key = Some(SecretString::from("sk-test".to_string()));
        OpenAiCompatibleClient::from_config(&config).expect("client")
    }

    #[test]
    fn completions_url_follows_the_provider() {
        assert_eq!(
            client(LlmProvider::OpenAi).completions_url,
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            client(LlmProvider::Ollama).completions_url,
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn body_carries_model_messages_and_sampling() {
        let client = client(LlmProvider::OpenAi);
        let request = ChatRequest {
            messages: vec![
                ChatMessage::new(ChatRole::System, "be brief"),
                ChatMessage::new(ChatRole::User, "hi"),
            ],
            sampling: SamplingParams::default(),
        };

        let body = serde_json::to_value(client.body(&request)).expect("serialize");

        assert_eq!(body["model"], client.model.as_str());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["max_tokens"], 300);
    }

    #[test]
    fn first_choice_is_trimmed() {
        let payload: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Hello there!\n"}}]}"#,
        )
        .expect("payload");

        assert_eq!(first_choice(payload).expect("content"), "Hello there!");
    }

    #[test]
    fn missing_choices_is_an_error() {
        let payload: CompletionResponse = serde_json::from_str("{}").expect("payload");
        assert!(first_choice(payload).is_err());
    }

    #[test]
    fn only_throttling_and_server_errors_are_retried() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }
}
