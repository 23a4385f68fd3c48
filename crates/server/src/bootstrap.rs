use std::sync::Arc;

use leadline_agent::{
    AgentRuntime, ConversationSummarizer, LlmResponseGenerator, ResponseGenerator, SamplingParams,
};
use leadline_core::config::{AppConfig, ConfigError};
use leadline_db::{
    connect_with_settings, migrations, ConversationRepository, DbPool, MessageRepository,
    SqlConversationRepository, SqlMessageRepository,
};
use thiserror::Error;
use tracing::info;

use crate::llm_client::OpenAiCompatibleClient;
use crate::routes::AppState;
use crate::webhook;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client could not be built: {0}")]
    LlmClient(#[source] reqwest::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let client = Arc::new(
        OpenAiCompatibleClient::from_config(&config.llm).map_err(BootstrapError::LlmClient)?,
    );
    let sampling = SamplingParams {
        temperature: config.llm.temperature,
        max_tokens: config.llm.max_tokens,
        presence_penalty: config.llm.presence_penalty,
        frequency_penalty: config.llm.frequency_penalty,
    };
    let responder: Arc<dyn ResponseGenerator> =
        Arc::new(LlmResponseGenerator::new(Arc::clone(&client), sampling));
    let summarizer = Arc::new(ConversationSummarizer::new(client));
    info!(
        event_name = "system.bootstrap.llm_configured",
        correlation_id = "bootstrap",
        provider = ?config.llm.provider,
        model = %config.llm.model,
        endpoint = %config.llm.endpoint(),
        "response generator configured"
    );

    let conversations: Arc<dyn ConversationRepository> =
        Arc::new(SqlConversationRepository::new(db_pool.clone()));
    let messages: Arc<dyn MessageRepository> =
        Arc::new(SqlMessageRepository::new(db_pool.clone()));
    let runtime = AgentRuntime::new(conversations.clone(), messages.clone(), responder)
        .with_history_limit(config.conversation.history_limit);

    let state = AppState {
        runtime: Arc::new(runtime),
        summarizer,
        conversations,
        messages,
        templates: webhook::templates(),
    };

    Ok(Application { config, db_pool, state })
}

#[cfg(test)]
mod tests {
    use leadline_core::config::{AppConfig, ConfigOverrides, LlmProvider, LoadOptions};

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?).await
    }

    fn options(database_url: &str, provider: LlmProvider) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                llm_provider: Some(provider),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_an_openai_key() {
        let result = bootstrap(options("sqlite::memory:", LlmProvider::OpenAi)).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("llm.api_key"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_wires_the_stores() {
        let app = bootstrap(options("sqlite::memory:", LlmProvider::Ollama))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('conversation_state', 'conversation_message')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("tables should exist after bootstrap");
        assert_eq!(table_count, 2);

        let state = app.state.runtime.qualifier().init_state("whatsapp:+971501234567").await;
        assert!(state.is_ok());
        let stats = app.state.conversations.stats(70).await.expect("stats");
        assert_eq!(stats.total_conversations, 1);

        app.db_pool.close().await;
    }
}
