use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use leadline_agent::{AgentRuntime, ConversationSummarizer};
use leadline_core::errors::{ApplicationError, InterfaceError};
use leadline_db::{ConversationRepository, DbPool, MessageRepository};
use serde::Serialize;
use tera::Tera;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{health, leads, webhook};

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<AgentRuntime>,
    pub summarizer: Arc<ConversationSummarizer>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub templates: Arc<Tera>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

pub fn router(state: AppState, db_pool: DbPool) -> Router {
    Router::new()
        .route("/webhook/whatsapp", post(webhook::whatsapp_webhook))
        .route("/leads", get(leads::list_leads))
        .route("/leads/export", get(leads::export_leads))
        .route(
            "/conversations/{phone}",
            get(leads::get_conversation).delete(leads::delete_conversation),
        )
        .route("/conversations/{phone}/complete", post(leads::complete_conversation))
        .route("/conversation-summary/{phone}", get(leads::conversation_summary))
        .route("/stats", get(leads::stats))
        .with_state(state)
        .merge(health::router(db_pool))
}

pub fn correlation_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn application_error(
    error: ApplicationError,
    correlation_id: String,
) -> (StatusCode, Json<ApiError>) {
    interface_error(error.into_interface(correlation_id))
}

pub fn interface_error(error: InterfaceError) -> (StatusCode, Json<ApiError>) {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };

    if status.is_server_error() {
        error!(
            event_name = "http.request.failed",
            correlation_id = %error.correlation_id(),
            error = %error,
            "request failed"
        );
    } else {
        warn!(
            event_name = "http.request.rejected",
            correlation_id = %error.correlation_id(),
            error = %error,
            "request rejected"
        );
    }

    (
        status,
        Json(ApiError {
            error: error.user_message().to_string(),
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}

/// Paths carry the bare number; stored conversation ids keep the channel prefix.
pub fn conversation_id_for(phone: &str) -> String {
    let phone = phone.trim();
    if phone.starts_with("whatsapp:") {
        phone.to_string()
    } else {
        format!("whatsapp:{phone}")
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use leadline_agent::{
        AgentRuntime, ChatRequest, ConversationSummarizer, LlmClient, ResponseGenerator,
    };
    use leadline_core::domain::conversation::{ConversationMessage, ConversationState};
    use leadline_db::{InMemoryConversationRepository, InMemoryMessageRepository};

    use super::AppState;
    use crate::webhook;

    pub struct EchoResponder;

    #[async_trait]
    impl ResponseGenerator for EchoResponder {
        async fn generate(
            &self,
            state: &ConversationState,
            _text: &str,
            _history: &[ConversationMessage],
        ) -> Result<String> {
            Ok(format!("Thanks! Your lead score is now {}.", state.score))
        }
    }

    /// Summarises by counting the transcript lines it was given.
    pub struct LineCountClient;

    #[async_trait]
    impl LlmClient for LineCountClient {
        async fn complete(&self, request: &ChatRequest) -> Result<String> {
            let prompt = request.messages.last().map(|m| m.content.as_str()).unwrap_or_default();
            let lines = prompt.split("Conversation:\n").nth(1).map_or(0, |t| t.lines().count());
            Ok(format!("Summary of {lines} messages."))
        }
    }

    pub fn state() -> AppState {
        let conversations = Arc::new(InMemoryConversationRepository::default());
        let messages = Arc::new(InMemoryMessageRepository::default());
        let runtime =
            AgentRuntime::new(conversations.clone(), messages.clone(), Arc::new(EchoResponder));

        AppState {
            runtime: Arc::new(runtime),
            summarizer: Arc::new(ConversationSummarizer::new(Arc::new(LineCountClient))),
            conversations,
            messages,
            templates: webhook::templates(),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use leadline_core::errors::{ApplicationError, DomainError};
    use leadline_db::connect_with_settings;
    use tower::ServiceExt;

    use super::{application_error, conversation_id_for, router, test_support};

    #[test]
    fn phone_paths_gain_the_channel_prefix_once() {
        assert_eq!(conversation_id_for("+971501234567"), "whatsapp:+971501234567");
        assert_eq!(conversation_id_for("whatsapp:+971501234567"), "whatsapp:+971501234567");
    }

    #[test]
    fn domain_errors_become_bad_requests() {
        let (status, body) = application_error(
            ApplicationError::Domain(DomainError::MissingConversationId),
            "req-7".to_string(),
        );

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.correlation_id, "req-7");
    }

    #[test]
    fn persistence_errors_become_service_unavailable() {
        let (status, _) = application_error(
            ApplicationError::Persistence("disk full".to_string()),
            "req-8".to_string(),
        );
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn webhook_round_trip_through_the_router() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        let app = router(test_support::state(), pool.clone());

        let response = app
            .oneshot(
                Request::post("/webhook/whatsapp")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "Body=I+want+a+villa+in+JVC&From=whatsapp%3A%2B971501234567&To=whatsapp%3A%2B14155238886",
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).and_then(|value| value.to_str().ok()),
            Some("application/xml")
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = String::from_utf8(body.to_vec()).expect("utf8");
        assert!(body.contains("<Message>Thanks! Your lead score is now 30.</Message>"));

        pool.close().await;
    }

    #[tokio::test]
    async fn conversation_summary_is_routed_with_not_found_for_strangers() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        let state = test_support::state();
        state
            .runtime
            .handle_message("whatsapp:+971501234567", "villa in JVC around 2M")
            .await
            .expect("reply");
        let app = router(state, pool.clone());

        let found = app
            .clone()
            .oneshot(
                Request::get("/conversation-summary/+971501234567")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(found.status(), StatusCode::OK);
        let body = to_bytes(found.into_body(), usize::MAX).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload["summary"], "Summary of 2 messages.");
        assert_eq!(payload["lead"]["conversation_id"], "whatsapp:+971501234567");

        let missing = app
            .oneshot(
                Request::get("/conversation-summary/+971509999999")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        pool.close().await;
    }

    #[tokio::test]
    async fn health_is_served_by_the_same_router() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        let app = router(test_support::state(), pool.clone());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        pool.close().await;
    }
}
